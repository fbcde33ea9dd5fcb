//! PersistenceSink - appends prediction documents to daily JSONL files

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Utc;
use contracts::{ContractError, PredictionResult, PredictionSink, SinkKind};
use serde_json::Value;
use tracing::{debug, error, instrument};

/// Configuration for PersistenceSink
#[derive(Debug, Clone)]
pub struct PersistenceSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl PersistenceSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./predictions"));

        Self { base_path }
    }
}

/// Open file for the current UTC day
struct DailyFile {
    date: String,
    writer: BufWriter<File>,
}

/// Sink that stores record + features + prediction for later analysis
///
/// One JSON document per line in `{base_path}/{YYYY-MM-DD}.jsonl`.
pub struct PersistenceSink {
    name: String,
    config: PersistenceSinkConfig,
    current: Option<DailyFile>,
}

impl PersistenceSink {
    /// Create a new PersistenceSink
    pub fn new(name: impl Into<String>, config: PersistenceSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            current: None,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, PersistenceSinkConfig::from_params(params))
    }

    fn writer_for(&mut self, date: String) -> std::io::Result<&mut BufWriter<File>> {
        let rotate = self.current.as_ref().is_none_or(|c| c.date != date);
        if rotate {
            if let Some(mut previous) = self.current.take() {
                previous.writer.flush()?;
            }
            let path = self.config.base_path.join(format!("{date}.jsonl"));
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            debug!(sink = %self.name, path = %path.display(), "Opened analysis file");
            self.current = Some(DailyFile {
                date,
                writer: BufWriter::new(file),
            });
        }

        match self.current.as_mut() {
            Some(current) => Ok(&mut current.writer),
            None => Err(std::io::Error::other("no open analysis file")),
        }
    }

    fn append(&mut self, result: &PredictionResult) -> std::io::Result<()> {
        let now = Utc::now();
        let mut document = result.analysis_document();
        document.insert("persisted_at".to_string(), Value::from(now.to_rfc3339()));

        let mut line = serde_json::to_vec(&document)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push(b'\n');

        let writer = self.writer_for(now.format("%Y-%m-%d").to_string())?;
        writer.write_all(&line)?;
        writer.flush()
    }

    fn persist(&mut self, result: &PredictionResult) -> Result<(), ContractError> {
        self.append(result).map_err(|e| {
            error!(sink = %self.name, ride_id = %result.ride_id, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl PredictionSink for PersistenceSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Local
    }

    #[instrument(
        name = "persistence_sink_write",
        skip(self, result),
        fields(sink = %self.name, ride_id = %result.ride_id)
    )]
    async fn write(&mut self, result: &PredictionResult) -> Result<(), ContractError> {
        self.persist(result)
    }

    #[instrument(name = "persistence_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(current) = self.current.as_mut() {
            current
                .writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "persistence_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.current = None;
        debug!(sink = %self.name, "PersistenceSink closed");
        Ok(())
    }
}
