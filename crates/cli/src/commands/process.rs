//! `process` command implementation.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::StreamBatch;
use ingestion::{EventDecoder, MockRideSource};
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::cli::ProcessArgs;
use crate::pipeline::{build_dispatcher, load_service_config, RunStats};

/// Execute the `process` command
pub async fn run_process(args: &ProcessArgs) -> Result<()> {
    let mut config = load_service_config(&args.service)?;
    if let Some(policy) = args.decode_failure {
        config.dispatcher.decode_failure = policy.into();
    }

    if config.server.metrics_port != 0 {
        observability::init_metrics_only(config.server.metrics_port)?;
    }

    let batch = read_batch(args).await?;
    info!(records = batch.records.len(), "Batch loaded");

    let dispatcher = build_dispatcher(&config).await?;

    let started = Instant::now();
    let result = dispatcher.process_stream_batch(&batch).await;
    let mut stats = RunStats::new(batch.records.len());
    stats.duration = started.elapsed();

    // Flush sinks before reporting, also when the batch failed
    let sink_metrics = dispatcher.metrics();
    dispatcher.shutdown().await;

    let result = result.context("Batch processing failed")?;

    let output = serde_json::to_string_pretty(&result.to_stream_output())
        .context("Failed to serialize stream output")?;
    println!("{}", output);

    stats.record_batch(&result);
    stats.record_sinks(&sink_metrics);
    info!(
        predictions = result.predictions.len(),
        skipped = result.skipped_records.len(),
        duration_secs = stats.duration.as_secs_f64(),
        "Batch completed"
    );

    if !args.no_stats {
        stats.print_summary();
    }

    Ok(())
}

async fn read_batch(args: &ProcessArgs) -> Result<StreamBatch> {
    if let Some(count) = args.mock {
        info!(count, "Generating mock rides");
        return MockRideSource::default()
            .stream_batch(count)
            .context("Failed to generate mock batch");
    }

    let input = args
        .input
        .as_deref()
        .context("No input given (use --input or --mock)")?;
    let body = read_input(input).await?;

    EventDecoder::parse_batch(&body)
        .with_context(|| format!("Invalid stream batch in {}", input.display()))
}

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut body = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut body)
            .await
            .context("Failed to read stdin")?;
        Ok(body)
    } else {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ServiceArgs;
    use std::io::Write;

    fn args(input: Option<&Path>, mock: Option<usize>) -> ProcessArgs {
        ProcessArgs {
            service: ServiceArgs::default(),
            input: input.map(Path::to_path_buf),
            mock,
            decode_failure: None,
            no_stats: true,
        }
    }

    #[tokio::test]
    async fn test_read_batch_from_file() {
        let batch = MockRideSource::default().stream_batch(2).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&serde_json::to_vec(&batch).unwrap())
            .unwrap();

        let loaded = read_batch(&args(Some(file.path()), None)).await.unwrap();
        assert_eq!(loaded.payloads(), batch.payloads());
    }

    #[tokio::test]
    async fn test_read_batch_mock() {
        let loaded = read_batch(&args(None, Some(4))).await.unwrap();
        assert_eq!(loaded.records.len(), 4);
    }

    #[tokio::test]
    async fn test_read_batch_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();

        assert!(read_batch(&args(Some(file.path()), None)).await.is_err());
    }

    #[tokio::test]
    async fn test_run_process_mock() {
        assert!(run_process(&args(None, Some(3))).await.is_ok());
    }
}
