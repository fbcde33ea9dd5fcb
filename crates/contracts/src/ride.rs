//! Ride input model
//!
//! `RideRecord` is the raw trip description, `RideEvent` pairs it with the
//! caller supplied `ride_id`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Taxi zone identifier, numeric in the trip data but accepted as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationId {
    Int(i64),
    Text(String),
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for LocationId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for LocationId {
    fn from(id: i32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for LocationId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// Ride identifier, any JSON scalar, echoed back exactly as received.
///
/// Variant order matters for untagged deserialization: integers above
/// `i64::MAX` must land in `UInt` before `Float` can claim them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RideId {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    /// Explicit `null`; an absent `ride_id` is still a decode error
    Null,
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(id) => write!(f, "{id}"),
            Self::Int(id) => write!(f, "{id}"),
            Self::UInt(id) => write!(f, "{id}"),
            Self::Float(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for RideId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<u64> for RideId {
    fn from(id: u64) -> Self {
        i64::try_from(id).map_or(Self::UInt(id), Self::Int)
    }
}

impl From<i32> for RideId {
    fn from(id: i32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for RideId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for RideId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Raw ride record, immutable once parsed.
///
/// Fields other than the two location ids and the distance are optional and
/// kept in `extra` so downstream analysis sinks receive the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRecord {
    #[serde(rename = "PULocationID")]
    pub pickup_location_id: LocationId,

    #[serde(rename = "DOLocationID")]
    pub dropoff_location_id: LocationId,

    pub trip_distance: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RideRecord {
    /// Record with only the required fields
    pub fn new(
        pickup_location_id: impl Into<LocationId>,
        dropoff_location_id: impl Into<LocationId>,
        trip_distance: f64,
    ) -> Self {
        Self {
            pickup_location_id: pickup_location_id.into(),
            dropoff_location_id: dropoff_location_id.into(),
            trip_distance,
            extra: Map::new(),
        }
    }
}

/// One logical unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideEvent {
    pub ride: RideRecord,
    pub ride_id: RideId,
}

impl RideEvent {
    pub fn new(ride_id: impl Into<RideId>, ride: RideRecord) -> Self {
        Self {
            ride,
            ride_id: ride_id.into(),
        }
    }
}
