//! # Dispatcher
//!
//! Prediction dispatch module.
//!
//! Responsible for:
//! - Running decode -> features -> predict -> build for every ride
//! - Fan-out of each `PredictionResult` to the registered sinks
//! - Isolating slow or failing sinks from the ride path
//! - Test mode: network sinks are skipped, local ones still run

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod result;
pub mod sinks;

pub use contracts::{PredictionResult, PredictionSink};
pub use dispatcher::{create_sink_handle, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::{DeliveryOutcome, SinkHandle};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use result::ResultBuilder;
pub use sinks::{
    LogSink, MonitoringForwardSink, PersistenceSink, RepublishSink, StreamPublisher,
    UdpStreamPublisher,
};
