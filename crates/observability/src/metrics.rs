//! Dispatch metrics
//!
//! Prometheus recorders for the dispatcher pipeline plus an in-memory
//! aggregator used for run summaries.

use std::collections::BTreeMap;

use contracts::{DecodeStage, PredictionResult};
use metrics::{counter, gauge, histogram};

/// Outcome of one sink invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SinkOutcome {
    Success,
    Failure,
    Skipped,
    Dropped,
    Timeout,
}

impl SinkOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Skipped => "skipped",
            Self::Dropped => "dropped",
            Self::Timeout => "timeout",
        }
    }
}

/// Record an incoming batch
pub fn record_batch_received(size: usize) {
    counter!("ride_dispatch_batches_total").increment(1);
    counter!("ride_dispatch_records_received_total").increment(size as u64);
    histogram!("ride_dispatch_batch_size").record(size as f64);
}

/// Record a record that could not be decoded
pub fn record_decode_failure(stage: DecodeStage) {
    counter!(
        "ride_dispatch_decode_failures_total",
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// Record a successful prediction
pub fn record_prediction(result: &PredictionResult, latency_ms: f64) {
    counter!(
        "ride_dispatch_predictions_total",
        "model_version" => result.model_version.clone()
    )
    .increment(1);
    histogram!("ride_dispatch_prediction_latency_ms").record(latency_ms);
    histogram!("ride_dispatch_prediction_value").record(result.prediction);
    gauge!("ride_dispatch_last_prediction").set(result.prediction);
}

/// Record a predictor failure
pub fn record_prediction_failure() {
    counter!("ride_dispatch_prediction_failures_total").increment(1);
}

/// Record the outcome of handing a result to a sink
pub fn record_sink_dispatch(sink_name: &str, outcome: SinkOutcome) {
    counter!(
        "ride_dispatch_sink_results_total",
        "sink" => sink_name.to_string(),
        "status" => outcome.as_str()
    )
    .increment(1);
}

/// Prediction statistics aggregator
///
/// Aggregates in memory for end-of-run summaries.
#[derive(Debug, Clone, Default)]
pub struct PredictionStatsAggregator {
    /// Total predictions
    pub total_predictions: u64,

    /// Records left out of batch results
    pub total_skipped: u64,

    /// Prediction value statistics
    pub prediction_stats: RunningStats,

    /// Trip distance statistics
    pub distance_stats: RunningStats,

    /// Predictions per model version
    pub version_counts: BTreeMap<String, u64>,

    /// Outcomes per sink
    pub sink_outcomes: BTreeMap<String, BTreeMap<SinkOutcome, u64>>,
}

impl PredictionStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one prediction
    pub fn update(&mut self, result: &PredictionResult) {
        self.total_predictions += 1;
        self.prediction_stats.push(result.prediction);
        self.distance_stats.push(result.features.trip_distance);
        *self
            .version_counts
            .entry(result.model_version.clone())
            .or_insert(0) += 1;
    }

    /// Count records skipped by the decode policy
    pub fn add_skipped(&mut self, count: usize) {
        self.total_skipped += count as u64;
    }

    /// Add `count` sink outcomes
    pub fn add_sink_outcome(&mut self, sink_name: &str, outcome: SinkOutcome, count: u64) {
        if count == 0 {
            return;
        }
        *self
            .sink_outcomes
            .entry(sink_name.to_string())
            .or_default()
            .entry(outcome)
            .or_insert(0) += count;
    }

    /// Generate summary
    pub fn summary(&self) -> PredictionSummary {
        PredictionSummary {
            total_predictions: self.total_predictions,
            total_skipped: self.total_skipped,
            prediction: StatsSummary::from(&self.prediction_stats),
            trip_distance: StatsSummary::from(&self.distance_stats),
            version_counts: self.version_counts.clone(),
            sink_outcomes: self.sink_outcomes.clone(),
        }
    }
}

/// Summary report
#[derive(Debug, Clone, Default)]
pub struct PredictionSummary {
    pub total_predictions: u64,
    pub total_skipped: u64,
    pub prediction: StatsSummary,
    pub trip_distance: StatsSummary,
    pub version_counts: BTreeMap<String, u64>,
    pub sink_outcomes: BTreeMap<String, BTreeMap<SinkOutcome, u64>>,
}

impl std::fmt::Display for PredictionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Prediction Summary ===")?;
        writeln!(f, "Predictions: {}", self.total_predictions)?;
        writeln!(f, "Skipped records: {}", self.total_skipped)?;
        writeln!(f, "Predicted duration: {}", self.prediction)?;
        writeln!(f, "Trip distance: {}", self.trip_distance)?;

        for (version, count) in &self.version_counts {
            writeln!(f, "Model version {}: {}", version, count)?;
        }

        if !self.sink_outcomes.is_empty() {
            writeln!(f, "Sink outcomes:")?;
            for (sink, outcomes) in &self.sink_outcomes {
                let parts: Vec<String> = outcomes
                    .iter()
                    .map(|(outcome, count)| format!("{}={}", outcome.as_str(), count))
                    .collect();
                writeln!(f, "  {}: {}", sink, parts.join(", "))?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FeatureVector, RideId, RideRecord, STATUS_OK};

    fn result(prediction: f64, version: &str) -> PredictionResult {
        PredictionResult {
            model_name: "ride_prediction_model".into(),
            model_version: version.into(),
            ride_id: RideId::Int(1),
            prediction,
            status_code: STATUS_OK,
            ride: RideRecord::new(1, 2, 2.0),
            features: FeatureVector {
                pu_do: "1_2".into(),
                trip_distance: 2.0,
            },
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = PredictionStatsAggregator::new();

        aggregator.update(&result(10.0, "v1"));
        aggregator.update(&result(14.0, "v1"));
        aggregator.update(&result(12.0, "v2"));
        aggregator.add_skipped(2);
        aggregator.add_sink_outcome("republish", SinkOutcome::Skipped, 3);
        aggregator.add_sink_outcome("republish", SinkOutcome::Failure, 0);

        assert_eq!(aggregator.total_predictions, 3);
        assert_eq!(aggregator.total_skipped, 2);
        assert_eq!(aggregator.version_counts.get("v1"), Some(&2));
        assert!((aggregator.prediction_stats.mean() - 12.0).abs() < 1e-10);

        let outcomes = &aggregator.sink_outcomes["republish"];
        assert_eq!(outcomes.get(&SinkOutcome::Skipped), Some(&3));
        assert!(!outcomes.contains_key(&SinkOutcome::Failure));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = PredictionStatsAggregator::new();
        aggregator.update(&result(11.0, "Test123"));
        aggregator.add_sink_outcome("persistence", SinkOutcome::Success, 1);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Predictions: 1"));
        assert!(output.contains("Model version Test123: 1"));
        assert!(output.contains("persistence: success=1"));
    }
}
