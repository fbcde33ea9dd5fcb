//! LogSink - logs prediction summary via tracing

use contracts::{ContractError, PredictionResult, PredictionSink, SinkKind};
use tracing::{info, instrument};

/// Sink that logs prediction summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_summary(&self, result: &PredictionResult) {
        info!(
            sink = %self.name,
            ride_id = %result.ride_id,
            pu_do = %result.features.pu_do,
            trip_distance = result.features.trip_distance,
            prediction = result.prediction,
            model_version = %result.model_version,
            "Prediction produced"
        );
    }
}

impl PredictionSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Local
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, result),
        fields(sink = %self.name, ride_id = %result.ride_id)
    )]
    async fn write(&mut self, result: &PredictionResult) -> Result<(), ContractError> {
        self.log_summary(result);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_result;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        assert!(sink.write(&sample_result(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_is_local() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
        assert_eq!(sink.kind(), SinkKind::Local);
    }
}
