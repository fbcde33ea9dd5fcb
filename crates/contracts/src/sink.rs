//! PredictionSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{ContractError, PredictionResult};

/// Whether a sink performs network I/O.
///
/// Network sinks are skipped while the dispatcher runs in test mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Talks to a remote service (stream, monitoring endpoint)
    Network,
    /// Local side effect only (log, filesystem)
    Local,
}

/// Prediction output trait
///
/// All sink implementations must implement this trait. A sink never mutates
/// the result it receives.
#[trait_variant::make(PredictionSink: Send)]
pub trait LocalPredictionSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Network or local side effect
    fn kind(&self) -> SinkKind;

    /// Handle one prediction result
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, result: &PredictionResult) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
