//! ServiceConfig - Config Loader output
//!
//! Describes the whole service: model identity, dispatcher behaviour,
//! HTTP trigger and the ordered sink list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ServiceConfig {
    /// Model identity and artifact
    #[serde(default)]
    #[validate(nested)]
    pub model: ModelConfig,

    /// Dispatcher behaviour
    #[serde(default)]
    #[validate(nested)]
    pub dispatcher: DispatcherSettings,

    /// HTTP trigger
    #[serde(default)]
    pub server: ServerConfig,

    /// Sinks in registration order
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// Model identity reported in every prediction
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ModelConfig {
    /// Model name (e.g., "ride_prediction_model")
    #[serde(default = "default_model_name")]
    #[validate(length(min = 1, message = "model name cannot be empty"))]
    pub name: String,

    /// Explicit model version
    #[serde(default)]
    pub version: Option<String>,

    /// Training run id, used as version when `version` is absent
    #[serde(default)]
    pub run_id: Option<String>,

    /// Path to the linear model artifact (JSON)
    #[serde(default)]
    pub artifact: Option<PathBuf>,

    /// Fixed prediction used when no artifact is configured
    #[serde(default)]
    pub constant_prediction: Option<f64>,
}

fn default_model_name() -> String {
    "ride_prediction_model".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            version: None,
            run_id: None,
            artifact: None,
            constant_prediction: None,
        }
    }
}

impl ModelConfig {
    /// Version reported in results: `version`, else `run_id`, else "unknown"
    pub fn resolved_version(&self) -> &str {
        self.version
            .as_deref()
            .or(self.run_id.as_deref())
            .unwrap_or("unknown")
    }
}

/// Dispatcher behaviour
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatcherSettings {
    /// Skip network sinks (republish, monitoring)
    #[serde(default)]
    pub test_run: bool,

    /// What to do with a record that cannot be decoded
    #[serde(default)]
    pub decode_failure: DecodeFailurePolicy,

    /// Upper bound for one sink delivery (milliseconds)
    #[serde(default = "default_sink_timeout_ms")]
    #[validate(range(min = 1, message = "sink_timeout_ms must be > 0"))]
    pub sink_timeout_ms: u64,
}

fn default_sink_timeout_ms() -> u64 {
    5000
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            test_run: false,
            decode_failure: DecodeFailurePolicy::default(),
            sink_timeout_ms: default_sink_timeout_ms(),
        }
    }
}

impl DispatcherSettings {
    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }
}

/// Decode failure policy for batch invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// Fail the whole batch on the first bad record
    #[default]
    Abort,
    /// Log and leave the record out of the batch result
    Skip,
}

/// HTTP trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_address")]
    pub address: SocketAddr,

    /// Serve Prometheus metrics on `/metrics`
    #[serde(default)]
    pub export_prometheus: bool,

    /// Standalone Prometheus listener port (0 = disabled)
    #[serde(default)]
    pub metrics_port: u16,
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9696))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            export_prometheus: false,
            metrics_port: 0,
        }
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity of the sink worker
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "queue_capacity must be > 0"))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Re-publish to the output stream
    Republish,
    /// Append to the analysis store
    Persistence,
    /// Forward to the drift monitoring service
    Monitoring,
    /// Structured log line
    Log,
}

impl SinkType {
    /// Parameters that must be present in `SinkConfig::params`
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Republish => &["stream", "addr"],
            Self::Persistence => &["base_path"],
            Self::Monitoring => &["base_url"],
            Self::Log => &[],
        }
    }
}
