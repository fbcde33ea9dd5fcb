//! # Ingestion
//!
//! Ride event ingestion module.
//!
//! Responsibilities:
//! - Parse the stream runtime envelope into raw base64 payloads
//! - Decode payloads into `RideEvent` (`EventDecoder`)
//! - Derive the model input (`extract_features`)
//! - Generate synthetic ride traffic for local runs and tests
//!
//! ## Usage Example
//!
//! ```
//! use contracts::{RideEvent, RideRecord};
//! use ingestion::{extract_features, EventDecoder};
//!
//! let event = RideEvent::new(256, RideRecord::new(130, 205, 3.66));
//! let raw = EventDecoder::encode(&event).unwrap();
//!
//! let decoded = EventDecoder::decode(&raw).unwrap();
//! assert_eq!(decoded, event);
//! assert_eq!(extract_features(&decoded.ride).pu_do, "130_205");
//! ```

mod decoder;
mod features;
mod mock;

pub use contracts::{FeatureVector, RideEvent, RideRecord, StreamBatch};
pub use decoder::EventDecoder;
pub use features::extract_features;
pub use mock::{MockRideConfig, MockRideSource};
