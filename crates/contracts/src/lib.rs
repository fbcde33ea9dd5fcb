//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the ride dispatcher:
//! the ride data model, wire shapes of both trigger paths, the `Predictor`
//! and `PredictionSink` capabilities and the service configuration.
//! Business crates only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data flow
//! - `RideEvent` -> `FeatureVector` -> prediction (`f64`) -> `PredictionResult`
//! - `PredictionResult` is handed read-only to every registered sink
//! - a batch invocation returns one `BatchResult`

mod envelope;
mod error;
mod features;
mod prediction;
mod predictor;
mod ride;
mod service_config;
mod sink;

pub use envelope::*;
pub use error::*;
pub use features::FeatureVector;
pub use prediction::*;
pub use predictor::Predictor;
pub use ride::*;
pub use service_config::*;
pub use sink::*;
