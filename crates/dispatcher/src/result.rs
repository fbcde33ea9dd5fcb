//! ResultBuilder - assembles the prediction envelope

use contracts::{FeatureVector, PredictionResult, RideEvent, STATUS_OK};

/// Builds `PredictionResult`s stamped with the serving model's identity
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    model_name: String,
    model_version: String,
}

impl ResultBuilder {
    pub fn new(model_name: impl Into<String>, model_version: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model_version: model_version.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Result for one ride; `ride_id` is carried over unchanged
    pub fn build(
        &self,
        event: RideEvent,
        features: FeatureVector,
        prediction: f64,
    ) -> PredictionResult {
        PredictionResult {
            model_name: self.model_name.clone(),
            model_version: self.model_version.clone(),
            ride_id: event.ride_id,
            prediction,
            status_code: STATUS_OK,
            ride: event.ride,
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{RideId, RideRecord};

    #[test]
    fn test_build_echoes_ride_id_and_model() {
        let builder = ResultBuilder::new("ride_prediction_model", "Test123");
        let event = RideEvent::new("abc-123", RideRecord::new(130, 205, 3.66));
        let features = ingestion::extract_features(&event.ride);

        let result = builder.build(event, features, 11.0);

        assert_eq!(result.ride_id, RideId::Text("abc-123".into()));
        assert_eq!(result.model_name, "ride_prediction_model");
        assert_eq!(result.model_version, "Test123");
        assert_eq!(result.prediction, 11.0);
        assert_eq!(result.status_code, 200);
        assert_eq!(result.features.pu_do, "130_205");
    }
}
