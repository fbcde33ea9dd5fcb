//! Mock ride source
//!
//! Deterministic synthetic ride traffic for local runs without a stream.

use contracts::{ContractError, RideEvent, RideRecord, StreamBatch};
use tracing::debug;

use crate::EventDecoder;

/// Mock ride source configuration
#[derive(Debug, Clone)]
pub struct MockRideConfig {
    /// Pickup/dropoff zones cycled through
    pub zones: Vec<i64>,

    /// Shortest generated trip (miles)
    pub min_distance: f64,

    /// Distance increment between consecutive rides (miles)
    pub distance_step: f64,

    /// Number of distinct distances before wrapping around
    pub distance_buckets: u64,

    /// First ride id
    pub first_ride_id: i64,
}

impl Default for MockRideConfig {
    fn default() -> Self {
        Self {
            zones: vec![43, 74, 75, 130, 166, 205, 236, 237],
            min_distance: 0.5,
            distance_step: 0.75,
            distance_buckets: 16,
            first_ride_id: 1,
        }
    }
}

/// Mock ride source
///
/// Ride `n` goes from `zones[n % len]` to `zones[(n * 3 + 1) % len]`.
pub struct MockRideSource {
    config: MockRideConfig,
}

impl MockRideSource {
    /// Create a new mock ride source
    pub fn new(config: MockRideConfig) -> Self {
        Self { config }
    }

    /// Generate `count` ride events
    pub fn events(&self, count: usize) -> Vec<RideEvent> {
        let zones = if self.config.zones.is_empty() {
            vec![1]
        } else {
            self.config.zones.clone()
        };
        let buckets = self.config.distance_buckets.max(1);

        let events: Vec<RideEvent> = (0..count)
            .map(|n| {
                let pickup = zones[n % zones.len()];
                let dropoff = zones[(n * 3 + 1) % zones.len()];
                let bucket = (n as u64 % buckets) as f64;
                let distance = self.config.min_distance + bucket * self.config.distance_step;
                RideEvent::new(
                    self.config.first_ride_id + n as i64,
                    RideRecord::new(pickup, dropoff, distance),
                )
            })
            .collect();

        debug!(count = events.len(), "Generated mock rides");
        events
    }

    /// Generate a stream runtime envelope with `count` encoded rides
    pub fn stream_batch(&self, count: usize) -> Result<StreamBatch, ContractError> {
        EventDecoder::encode_batch(&self.events(count))
    }
}

impl Default for MockRideSource {
    fn default() -> Self {
        Self::new(MockRideConfig::default())
    }
}
