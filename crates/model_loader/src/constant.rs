//! ConstantPredictor - fixed output, no artifact needed

use contracts::{ContractError, FeatureVector, Predictor};

/// Predictor returning the same value for every input.
///
/// Used for local runs without a trained artifact and as a test stub.
#[derive(Debug, Clone, Copy)]
pub struct ConstantPredictor {
    value: f64,
}

impl ConstantPredictor {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Predictor for ConstantPredictor {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, ContractError> {
        Ok(self.value)
    }
}
