//! Layered error definitions
//!
//! Categorized by source: config / decode / prediction / sink

use std::fmt;

use thiserror::Error;

/// Stage of the transport decoding that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// Outer trigger envelope (`Records[].kinesis.data`)
    Envelope,
    /// Base64 payload
    Base64,
    /// UTF-8 text of the decoded payload
    Utf8,
    /// JSON document / required keys
    Json,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Envelope => "envelope",
            Self::Base64 => "base64",
            Self::Utf8 => "utf8",
            Self::Json => "json",
        };
        f.write_str(stage)
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Decode Errors =====
    /// Malformed transport payload
    #[error("decode error ({stage}): {message}")]
    Decode { stage: DecodeStage, message: String },

    // ===== Prediction Errors =====
    /// Predictor capability failed
    #[error("prediction error from model '{model}': {message}")]
    Prediction { model: String, message: String },

    /// Model artifact could not be loaded
    #[error("model load error for '{path}': {message}")]
    ModelLoad { path: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(stage: DecodeStage, message: impl Into<String>) -> Self {
        Self::Decode {
            stage,
            message: message.into(),
        }
    }

    /// Create prediction error
    pub fn prediction(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Prediction {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create model load error
    pub fn model_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
