//! Wire shapes of the two trigger paths

use serde::{Deserialize, Serialize};

use crate::RideId;

/// Batch delivered by the stream runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamRecord>,
}

/// One stream record; `kinesis.data` holds base64(JSON(RideEvent))
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRecord {
    pub kinesis: StreamPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPayload {
    pub data: String,
}

impl StreamBatch {
    /// Raw base64 payloads in input order
    pub fn payloads(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.kinesis.data.as_str()).collect()
    }
}

/// Response returned to the stream runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamOutput {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub predictions: Vec<PredictionEnvelope>,
}

/// Prediction event as seen by stream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEnvelope {
    pub model: String,
    pub version: String,
    pub prediction: PredictionPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPayload {
    pub ride_id: RideId,
    pub prediction: f64,
}

/// Response of the single-record HTTP path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpPrediction {
    pub duration: f64,
    pub model_version: String,
}

/// Error body of the HTTP trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
