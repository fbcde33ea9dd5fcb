//! PredictionResult / BatchResult - Dispatcher output

use serde_json::{Map, Value};

use crate::{FeatureVector, PredictionEnvelope, PredictionPayload, RideId, RideRecord, StreamOutput};

/// Status code of a successfully processed event or batch
pub const STATUS_OK: u16 = 200;

/// Result envelope of one pipeline run.
///
/// Created once per `RideEvent` and handed read-only to each sink. The
/// originating record and features travel with it so analysis sinks can
/// merge them into what they store.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub model_name: String,
    pub model_version: String,
    pub ride_id: RideId,
    pub prediction: f64,
    pub status_code: u16,
    pub ride: RideRecord,
    pub features: FeatureVector,
}

impl PredictionResult {
    /// Wire shape used by the stream response and the republished stream
    pub fn envelope(&self) -> PredictionEnvelope {
        PredictionEnvelope {
            model: self.model_name.clone(),
            version: self.model_version.clone(),
            prediction: PredictionPayload {
                ride_id: self.ride_id.clone(),
                prediction: self.prediction,
            },
        }
    }

    /// Flat document of record fields, features and prediction.
    ///
    /// This is what persistence and drift monitoring receive.
    pub fn analysis_document(&self) -> Map<String, Value> {
        let mut doc = match serde_json::to_value(&self.ride) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        doc.insert("PU_DO".to_string(), Value::from(self.features.pu_do.clone()));
        doc.insert(
            "ride_id".to_string(),
            serde_json::to_value(&self.ride_id).unwrap_or(Value::Null),
        );
        doc.insert("prediction".to_string(), Value::from(self.prediction));
        doc.insert("model".to_string(), Value::from(self.model_name.clone()));
        doc.insert(
            "model_version".to_string(),
            Value::from(self.model_version.clone()),
        );
        doc
    }
}

/// Aggregated result of one batch invocation
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub status_code: u16,

    /// One entry per successfully decoded record, in input order
    pub predictions: Vec<PredictionResult>,

    /// Input positions of records skipped under the `skip` decode policy
    pub skipped_records: Vec<usize>,
}

impl BatchResult {
    pub fn new(predictions: Vec<PredictionResult>, skipped_records: Vec<usize>) -> Self {
        Self {
            status_code: STATUS_OK,
            predictions,
            skipped_records,
        }
    }

    /// Response body returned to the stream runtime
    pub fn to_stream_output(&self) -> StreamOutput {
        StreamOutput {
            status_code: self.status_code,
            predictions: self.predictions.iter().map(|p| p.envelope()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> PredictionResult {
        let mut ride = RideRecord::new(130, 205, 3.66);
        ride.extra
            .insert("lpep_pickup_datetime".into(), Value::from("2021-01-01 00:15:56"));
        PredictionResult {
            model_name: "ride_prediction_model".into(),
            model_version: "Test123".into(),
            ride_id: RideId::Int(256),
            prediction: 11.0,
            status_code: STATUS_OK,
            ride,
            features: FeatureVector {
                pu_do: "130_205".into(),
                trip_distance: 3.66,
            },
        }
    }

    #[test]
    fn analysis_document_merges_record_and_prediction() {
        let doc = sample_result().analysis_document();

        assert_eq!(doc["PULocationID"], Value::from(130));
        assert_eq!(doc["DOLocationID"], Value::from(205));
        assert_eq!(doc["PU_DO"], Value::from("130_205"));
        assert_eq!(doc["prediction"], Value::from(11.0));
        assert_eq!(doc["ride_id"], Value::from(256));
        assert_eq!(doc["lpep_pickup_datetime"], Value::from("2021-01-01 00:15:56"));
    }

    #[test]
    fn stream_output_shape() {
        let batch = BatchResult::new(vec![sample_result()], vec![]);
        let json = serde_json::to_value(batch.to_stream_output()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "statusCode": 200,
                "predictions": [{
                    "model": "ride_prediction_model",
                    "version": "Test123",
                    "prediction": {"ride_id": 256, "prediction": 11.0}
                }]
            })
        );
    }
}
