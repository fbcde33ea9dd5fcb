//! Predictor trait - model capability injected into the Dispatcher

use crate::{ContractError, FeatureVector};

/// Already-initialized model capability.
///
/// Implementations wrap a single in-memory model shared by every request, so
/// `predict` must be callable concurrently and must not mutate state.
pub trait Predictor: Send + Sync {
    /// Predict a ride duration (minutes) from a feature vector
    ///
    /// # Errors
    /// Returns `ContractError::Prediction` when the model cannot score the input
    fn predict(&self, features: &FeatureVector) -> Result<f64, ContractError>;
}

impl<P: Predictor + ?Sized> Predictor for std::sync::Arc<P> {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ContractError> {
        (**self).predict(features)
    }
}
