//! Run statistics for the `process` command.

use std::time::Duration;

use contracts::BatchResult;
use dispatcher::MetricsSnapshot;
use observability::PredictionStatsAggregator;

/// Statistics from one dispatcher run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Records in the input batch
    pub records_received: usize,

    /// Total duration of the run
    pub duration: Duration,

    /// Prediction and sink outcome aggregator
    pub predictions: PredictionStatsAggregator,
}

impl RunStats {
    pub fn new(records_received: usize) -> Self {
        Self {
            records_received,
            ..Self::default()
        }
    }

    /// Fold a finished batch in
    pub fn record_batch(&mut self, batch: &BatchResult) {
        for prediction in &batch.predictions {
            self.predictions.update(prediction);
        }
        self.predictions.add_skipped(batch.skipped_records.len());
    }

    /// Fold per-sink counters in
    pub fn record_sinks(&mut self, sinks: &[(String, MetricsSnapshot)]) {
        for (name, snapshot) in sinks {
            for (outcome, count) in snapshot.outcomes() {
                self.predictions.add_sink_outcome(name, outcome, count);
            }
        }
    }

    /// Records per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary to stderr, stdout carries the stream response
    pub fn print_summary(&self) {
        eprintln!("\n=== Run Statistics ===");
        eprintln!("Records received: {}", self.records_received);
        eprintln!("Duration: {:.3}s", self.duration.as_secs_f64());
        eprintln!("Throughput: {:.2} records/s", self.throughput());
        eprintln!();
        eprint!("{}", self.predictions.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FeatureVector, PredictionResult, RideId, RideRecord, STATUS_OK};
    use observability::SinkOutcome;

    fn prediction(ride_id: i64) -> PredictionResult {
        PredictionResult {
            model_name: "ride_prediction_model".into(),
            model_version: "Test123".into(),
            ride_id: RideId::Int(ride_id),
            prediction: 11.0,
            status_code: STATUS_OK,
            ride: RideRecord::new(130, 205, 3.66),
            features: FeatureVector {
                pu_do: "130_205".into(),
                trip_distance: 3.66,
            },
        }
    }

    #[test]
    fn test_record_batch_and_sinks() {
        let mut stats = RunStats::new(3);
        stats.record_batch(&BatchResult::new(vec![prediction(1), prediction(2)], vec![1]));
        stats.record_sinks(&[(
            "republish".to_string(),
            MetricsSnapshot {
                skipped_count: 2,
                ..MetricsSnapshot::default()
            },
        )]);

        let summary = stats.predictions.summary();
        assert_eq!(summary.total_predictions, 2);
        assert_eq!(summary.total_skipped, 1);
        assert_eq!(
            summary.sink_outcomes["republish"].get(&SinkOutcome::Skipped),
            Some(&2)
        );
    }

    #[test]
    fn test_throughput_without_duration() {
        assert_eq!(RunStats::new(10).throughput(), 0.0);
    }
}
