//! Transport decoding for the streaming path
//!
//! A stream record carries `base64(JSON({"ride": {...}, "ride_id": ...}))`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use contracts::{ContractError, DecodeStage, RideEvent, StreamBatch};
use tracing::trace;

/// Decoder between transport payloads and `RideEvent`
///
/// Stateless; all methods are associated functions.
pub struct EventDecoder;

impl EventDecoder {
    /// Decode one base64 payload into a ride event
    ///
    /// # Errors
    /// - Invalid base64
    /// - Decoded bytes are not UTF-8
    /// - Malformed JSON or missing `ride` / `ride_id` / required ride fields
    pub fn decode(raw: impl AsRef<[u8]>) -> Result<RideEvent, ContractError> {
        let raw = raw.as_ref().trim_ascii();

        let bytes = STANDARD
            .decode(raw)
            .map_err(|e| ContractError::decode(DecodeStage::Base64, e.to_string()))?;

        let text = std::str::from_utf8(&bytes)
            .map_err(|e| ContractError::decode(DecodeStage::Utf8, e.to_string()))?;

        let event: RideEvent = serde_json::from_str(text)
            .map_err(|e| ContractError::decode(DecodeStage::Json, e.to_string()))?;

        trace!(ride_id = %event.ride_id, "Decoded ride event");
        Ok(event)
    }

    /// Encode a ride event the way producers put it on the stream
    pub fn encode(event: &RideEvent) -> Result<String, ContractError> {
        let json = serde_json::to_vec(event)
            .map_err(|e| ContractError::decode(DecodeStage::Json, e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    /// Parse the stream runtime envelope (`{"Records": [...]}`)
    pub fn parse_batch(body: &[u8]) -> Result<StreamBatch, ContractError> {
        serde_json::from_slice(body)
            .map_err(|e| ContractError::decode(DecodeStage::Envelope, e.to_string()))
    }

    /// Build a stream runtime envelope from ride events
    pub fn encode_batch(events: &[RideEvent]) -> Result<StreamBatch, ContractError> {
        let records = events
            .iter()
            .map(|event| {
                Ok(contracts::StreamRecord {
                    kinesis: contracts::StreamPayload {
                        data: Self::encode(event)?,
                    },
                })
            })
            .collect::<Result<Vec<_>, ContractError>>()?;

        Ok(StreamBatch { records })
    }
}
