//! LinearModel - one-hot linear regression over the ride feature vector
//!
//! Artifact format (JSON):
//!
//! ```json
//! {
//!   "intercept": 8.2,
//!   "trip_distance": 2.1,
//!   "pu_do": { "130_205": 1.4, "74_168": -0.6 },
//!   "version": "e1efc53e9bd149078b0c12aeaa6365df"
//! }
//! ```
//!
//! `prediction = intercept + trip_distance * coef + pu_do[PU_DO]`; an unseen
//! `PU_DO` contributes nothing, like an unknown category of a one-hot encoder.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use contracts::{ContractError, FeatureVector, Predictor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Serialized model weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearArtifact {
    pub intercept: f64,

    /// Coefficient of `trip_distance`
    pub trip_distance: f64,

    /// Weight per `PU_DO` category
    #[serde(default)]
    pub pu_do: HashMap<String, f64>,

    /// Version recorded by the training run
    #[serde(default)]
    pub version: Option<String>,
}

/// In-memory linear model, shared read-only by all requests
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    artifact: LinearArtifact,
}

impl LinearModel {
    /// Build from already-parsed weights
    pub fn new(name: impl Into<String>, artifact: LinearArtifact) -> Self {
        Self {
            name: name.into(),
            artifact,
        }
    }

    /// Load weights from a JSON artifact and warm the model up
    ///
    /// # Errors
    /// - File read failure
    /// - Parse failure
    /// - Non-finite weights (the probe prediction fails)
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self, ContractError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ContractError::model_load(path.display().to_string(), e.to_string()))?;

        let artifact: LinearArtifact = serde_json::from_str(&content)
            .map_err(|e| ContractError::model_load(path.display().to_string(), e.to_string()))?;

        let model = Self::new(name, artifact);

        // Probe so a broken artifact fails at cold start, not on the first ride
        let probe = FeatureVector {
            pu_do: String::new(),
            trip_distance: 0.0,
        };
        model
            .predict(&probe)
            .map_err(|e| ContractError::model_load(path.display().to_string(), e.to_string()))?;

        info!(
            model = %model.name,
            path = %path.display(),
            categories = model.artifact.pu_do.len(),
            "Linear model loaded"
        );
        Ok(model)
    }

    /// Version recorded in the artifact, if any
    pub fn artifact_version(&self) -> Option<&str> {
        self.artifact.version.as_deref()
    }
}

impl Predictor for LinearModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ContractError> {
        if !features.trip_distance.is_finite() {
            return Err(ContractError::prediction(
                &self.name,
                format!("trip_distance is not finite: {}", features.trip_distance),
            ));
        }

        let category = self
            .artifact
            .pu_do
            .get(&features.pu_do)
            .copied()
            .unwrap_or(0.0);

        let prediction = self.artifact.intercept
            + self.artifact.trip_distance * features.trip_distance
            + category;

        if !prediction.is_finite() {
            return Err(ContractError::prediction(
                &self.name,
                "model produced a non-finite prediction",
            ));
        }

        debug!(pu_do = %features.pu_do, prediction, "Scored ride");
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_model() -> LinearModel {
        LinearModel::new(
            "ride_prediction_model",
            LinearArtifact {
                intercept: 8.0,
                trip_distance: 2.0,
                pu_do: HashMap::from([("130_205".to_string(), 1.5)]),
                version: None,
            },
        )
    }

    fn features(pu_do: &str, trip_distance: f64) -> FeatureVector {
        FeatureVector {
            pu_do: pu_do.to_string(),
            trip_distance,
        }
    }

    #[test]
    fn test_known_category() {
        let prediction = sample_model().predict(&features("130_205", 3.0)).unwrap();
        assert!((prediction - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_unseen_category_contributes_nothing() {
        let prediction = sample_model().predict(&features("1_1", 1.0)).unwrap();
        assert!((prediction - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_distance_is_prediction_error() {
        let err = sample_model()
            .predict(&features("130_205", f64::NAN))
            .unwrap_err();
        assert!(matches!(err, ContractError::Prediction { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"intercept": 1.0, "trip_distance": 0.5,
                "pu_do": {{"1_2": 2.0}}, "version": "v7"}}"#
        )
        .unwrap();

        let model = LinearModel::load("m", file.path()).unwrap();
        assert_eq!(model.artifact_version(), Some("v7"));
        let prediction = model.predict(&features("1_2", 4.0)).unwrap();
        assert!((prediction - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_malformed_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"intercept": "high"}}"#).unwrap();

        let err = LinearModel::load("m", file.path()).unwrap_err();
        assert!(matches!(err, ContractError::ModelLoad { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LinearModel::load("m", Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ContractError::ModelLoad { .. }));
    }
}
