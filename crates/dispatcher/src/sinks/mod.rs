//! Sink implementations
//!
//! Contains LogSink, PersistenceSink, RepublishSink and MonitoringForwardSink.

mod log;
mod monitoring;
mod persistence;
mod republish;

pub use self::log::LogSink;
pub use self::monitoring::{MonitoringForwardSink, MonitoringSinkConfig};
pub use self::persistence::{PersistenceSink, PersistenceSinkConfig};
pub use self::republish::{
    LocalStreamPublisher, RepublishSink, StreamPublisher, UdpPublisherConfig, UdpStreamPublisher,
};
