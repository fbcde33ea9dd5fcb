//! Dispatcher error types

use contracts::{ContractError, RideId};
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// A batch record could not be decoded (abort policy)
    #[error("record {index} could not be decoded: {source}")]
    Decode {
        index: usize,
        #[source]
        source: ContractError,
    },

    /// The predictor failed for a ride
    #[error("prediction failed for ride {ride_id}: {source}")]
    Prediction {
        ride_id: RideId,
        #[source]
        source: ContractError,
    },
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the caller sent bad input (as opposed to a service fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
