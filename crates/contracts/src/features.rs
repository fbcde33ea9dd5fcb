//! FeatureVector - model input derived from a `RideRecord`

use serde::{Deserialize, Serialize};

/// Derived, stateless feature vector. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// `"{pickup_location_id}_{dropoff_location_id}"`
    #[serde(rename = "PU_DO")]
    pub pu_do: String,

    pub trip_distance: f64,
}
