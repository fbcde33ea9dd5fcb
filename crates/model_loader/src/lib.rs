//! # Model Loader
//!
//! Cold-start construction of the `Predictor` capability.
//!
//! Responsibilities:
//! - Load a linear model artifact from disk (`LinearModel`)
//! - Fall back to a fixed-output `ConstantPredictor` when no artifact is configured
//! - Resolve the model version reported in every prediction

mod constant;
mod linear;

use std::sync::Arc;

use contracts::{ContractError, ModelConfig, Predictor};
use tracing::{info, instrument, warn};

pub use constant::ConstantPredictor;
pub use linear::{LinearArtifact, LinearModel};

/// Prediction used when neither an artifact nor a constant is configured
pub const DEFAULT_CONSTANT_PREDICTION: f64 = 0.0;

/// Predictor ready to be injected into the dispatcher
#[derive(Clone)]
pub struct LoadedModel {
    pub name: String,
    pub version: String,
    pub predictor: Arc<dyn Predictor>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Build the predictor described by `config`
///
/// Version precedence: `config.version`, then the artifact's own version,
/// then `config.run_id`, then "unknown".
///
/// # Errors
/// Returns `ContractError::ModelLoad` when the artifact cannot be loaded
#[instrument(name = "model_loader_load", skip(config), fields(model = %config.name))]
pub fn load_predictor(config: &ModelConfig) -> Result<LoadedModel, ContractError> {
    match &config.artifact {
        Some(path) => {
            let model = LinearModel::load(&config.name, path)?;
            let version = config
                .version
                .as_deref()
                .or(model.artifact_version())
                .or(config.run_id.as_deref())
                .unwrap_or("unknown")
                .to_string();

            Ok(LoadedModel {
                name: config.name.clone(),
                version,
                predictor: Arc::new(model),
            })
        }
        None => {
            let value = config
                .constant_prediction
                .unwrap_or(DEFAULT_CONSTANT_PREDICTION);
            if config.constant_prediction.is_none() {
                warn!("No model artifact or constant configured, predicting {value}");
            } else {
                info!(value, "Using constant predictor");
            }

            Ok(LoadedModel {
                name: config.name.clone(),
                version: config.resolved_version().to_string(),
                predictor: Arc::new(ConstantPredictor::new(value)),
            })
        }
    }
}
