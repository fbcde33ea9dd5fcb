//! MonitoringForwardSink - forwards predictions to the drift monitoring service

use std::collections::HashMap;
use std::time::Duration;

use contracts::{ContractError, PredictionResult, PredictionSink, SinkKind};
use serde_json::Value;
use tracing::{debug, instrument};

/// Configuration for MonitoringForwardSink
#[derive(Debug, Clone)]
pub struct MonitoringSinkConfig {
    /// Monitoring service base URL, without trailing slash
    pub base_url: String,
    /// Dataset the service tracks drift for
    pub dataset: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl MonitoringSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_url = params
            .get("base_url")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| "missing 'base_url' parameter".to_string())?;

        let dataset = params
            .get("dataset")
            .cloned()
            .unwrap_or_else(|| "taxi".to_string());

        let timeout_ms: u64 = match params.get("timeout_ms") {
            Some(s) => s
                .parse()
                .map_err(|e| format!("invalid timeout_ms '{}': {}", s, e))?,
            None => 3000,
        };

        Ok(Self {
            base_url,
            dataset,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// `POST` target for new observations
    pub fn endpoint(&self) -> String {
        format!("{}/iterate/{}", self.base_url, self.dataset)
    }
}

/// Sink that posts merged record + prediction documents to the monitoring service
///
/// Best effort: a failed request surfaces as a sink error, which the
/// dispatcher logs and counts without failing the ride.
pub struct MonitoringForwardSink {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl MonitoringForwardSink {
    pub fn new(
        name: impl Into<String>,
        config: MonitoringSinkConfig,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))?;

        debug!(sink = %name, endpoint = %config.endpoint(), "MonitoringForwardSink created");

        Ok(Self {
            endpoint: config.endpoint(),
            name,
            client,
        })
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = MonitoringSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_connection(&name, e))?;
        Self::new(name, config)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PredictionSink for MonitoringForwardSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Network
    }

    #[instrument(
        name = "monitoring_sink_write",
        skip(self, result),
        fields(sink = %self.name, ride_id = %result.ride_id)
    )]
    async fn write(&mut self, result: &PredictionResult) -> Result<(), ContractError> {
        let body = vec![Value::Object(result.analysis_document())];

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;

        debug!(sink = %self.name, status = %response.status(), "Forwarded to monitoring");
        Ok(())
    }

    #[instrument(name = "monitoring_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "monitoring_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "MonitoringForwardSink closed");
        Ok(())
    }
}
