//! Feature extraction

use contracts::{FeatureVector, RideRecord};

/// Map a ride record to the model input.
///
/// `pu_do` is the textual concatenation `"{pickup}_{dropoff}"`, pickup first.
pub fn extract_features(record: &RideRecord) -> FeatureVector {
    FeatureVector {
        pu_do: format!(
            "{}_{}",
            record.pickup_location_id, record.dropoff_location_id
        ),
        trip_distance: record.trip_distance,
    }
}
