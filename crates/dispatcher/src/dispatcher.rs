//! Dispatcher - per-event pipeline and batch loop with fan-out to sinks

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use contracts::{
    BatchResult, ContractError, DecodeFailurePolicy, DispatcherSettings, PredictionResult,
    Predictor, RideEvent, SinkConfig, SinkKind, SinkType, StreamBatch,
};
use ingestion::{extract_features, EventDecoder};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::result::ResultBuilder;
use crate::sinks::{LogSink, MonitoringForwardSink, PersistenceSink, RepublishSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Model name stamped on every result
    pub model_name: String,
    /// Model version stamped on every result
    pub model_version: String,
    /// Skip network sinks
    pub test_mode: bool,
    /// Batch behaviour on undecodable records
    pub decode_failure: DecodeFailurePolicy,
    /// Upper bound for one sink delivery
    pub sink_timeout: Duration,
}

impl DispatcherConfig {
    pub fn new(model_name: impl Into<String>, model_version: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model_version: model_version.into(),
            ..Self::default()
        }
    }

    /// Take behaviour flags from the service configuration
    pub fn with_settings(mut self, settings: &DispatcherSettings) -> Self {
        self.test_mode = settings.test_run;
        self.decode_failure = settings.decode_failure;
        self.sink_timeout = settings.sink_timeout();
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn decode_failure(mut self, policy: DecodeFailurePolicy) -> Self {
        self.decode_failure = policy;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            model_name: "ride_prediction_model".to_string(),
            model_version: "unknown".to_string(),
            test_mode: false,
            decode_failure: DecodeFailurePolicy::Abort,
            sink_timeout: Duration::from_secs(5),
        }
    }
}

/// Sink waiting to be started, kept in registration order
enum PendingSink {
    Config(SinkConfig),
    Handle(SinkHandle),
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    predictor: Arc<dyn Predictor>,
    sinks: Vec<PendingSink>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            config,
            predictor,
            sinks: Vec::new(),
        }
    }

    /// Register sinks described by configuration
    pub fn with_sink_configs(mut self, configs: impl IntoIterator<Item = SinkConfig>) -> Self {
        self.sinks.extend(configs.into_iter().map(PendingSink::Config));
        self
    }

    /// Register an already running sink
    pub fn with_handle(mut self, handle: SinkHandle) -> Self {
        self.sinks.push(PendingSink::Handle(handle));
        self
    }

    /// Build the dispatcher, starting every configured sink
    ///
    /// Sinks started before a failure are shut down again.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(sink_count = self.sinks.len())
    )]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut handles = Vec::with_capacity(self.sinks.len());

        for pending in self.sinks {
            let handle = match pending {
                PendingSink::Handle(handle) => Ok(handle),
                PendingSink::Config(config) => create_sink_handle(&config).await,
            };

            match handle {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for started in handles {
                        started.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }

        Ok(Dispatcher::with_handles(self.config, self.predictor, handles))
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Persistence => {
            let sink = PersistenceSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Republish => {
            let sink = RepublishSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Monitoring => {
            let sink = MonitoringForwardSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Runs the decode -> features -> predict -> build -> fan-out pipeline
///
/// Immutable after construction; share it behind an `Arc` between
/// concurrent requests.
pub struct Dispatcher {
    config: DispatcherConfig,
    predictor: Arc<dyn Predictor>,
    results: ResultBuilder,
    handles: Vec<SinkHandle>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        config: DispatcherConfig,
        predictor: Arc<dyn Predictor>,
        handles: Vec<SinkHandle>,
    ) -> Self {
        let results = ResultBuilder::new(&config.model_name, &config.model_version);
        info!(
            model = %config.model_name,
            version = %config.model_version,
            test_mode = config.test_mode,
            sinks = handles.len(),
            "Dispatcher ready"
        );

        Self {
            config,
            predictor,
            results,
            handles,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.results.model_name()
    }

    pub fn model_version(&self) -> &str {
        self.results.model_version()
    }

    pub fn is_test_mode(&self) -> bool {
        self.config.test_mode
    }

    /// Sink names in registration order
    pub fn sink_names(&self) -> Vec<&str> {
        self.handles.iter().map(|h| h.name()).collect()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Process a batch of raw base64 payloads
    ///
    /// Records are handled one after another; predictions come back in input
    /// order. An undecodable record aborts the batch or is skipped, per
    /// `decode_failure`. A predictor failure always aborts.
    #[instrument(
        name = "dispatcher_process",
        skip(self, records),
        fields(batch_size = records.len())
    )]
    pub async fn process<R: AsRef<[u8]>>(
        &self,
        records: &[R],
    ) -> Result<BatchResult, DispatcherError> {
        observability::record_batch_received(records.len());

        let mut predictions = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for (index, raw) in records.iter().enumerate() {
            let event = match EventDecoder::decode(raw) {
                Ok(event) => event,
                Err(source) => {
                    if let ContractError::Decode { stage, .. } = &source {
                        observability::record_decode_failure(*stage);
                    }
                    match self.config.decode_failure {
                        DecodeFailurePolicy::Abort => {
                            error!(index, error = %source, "Undecodable record, aborting batch");
                            return Err(DispatcherError::Decode { index, source });
                        }
                        DecodeFailurePolicy::Skip => {
                            warn!(index, error = %source, "Undecodable record skipped");
                            skipped.push(index);
                            continue;
                        }
                    }
                }
            };

            predictions.push(self.run_pipeline(event).await?);
        }

        info!(
            predictions = predictions.len(),
            skipped = skipped.len(),
            "Batch processed"
        );
        Ok(BatchResult::new(predictions, skipped))
    }

    /// Process a stream runtime envelope
    pub async fn process_stream_batch(
        &self,
        batch: &StreamBatch,
    ) -> Result<BatchResult, DispatcherError> {
        self.process(&batch.payloads()).await
    }

    /// Process one already-decoded event (HTTP path)
    #[instrument(
        name = "dispatcher_process_event",
        skip(self, event),
        fields(ride_id = %event.ride_id)
    )]
    pub async fn process_event(
        &self,
        event: RideEvent,
    ) -> Result<PredictionResult, DispatcherError> {
        self.run_pipeline(event).await
    }

    async fn run_pipeline(&self, event: RideEvent) -> Result<PredictionResult, DispatcherError> {
        let features = extract_features(&event.ride);

        let started = Instant::now();
        let prediction = match self.predictor.predict(&features) {
            Ok(prediction) => prediction,
            Err(source) => {
                observability::record_prediction_failure();
                error!(ride_id = %event.ride_id, error = %source, "Prediction failed");
                return Err(DispatcherError::Prediction {
                    ride_id: event.ride_id,
                    source,
                });
            }
        };
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let result = Arc::new(self.results.build(event, features, prediction));
        observability::record_prediction(&result, latency_ms);
        debug!(ride_id = %result.ride_id, prediction, "Prediction built");

        self.fan_out(&result).await;

        Ok(Arc::unwrap_or_clone(result))
    }

    /// Hand the result to every sink in registration order
    ///
    /// Sink failures are counted and logged by the handle; they never reach
    /// the caller.
    async fn fan_out(&self, result: &Arc<PredictionResult>) {
        for handle in &self.handles {
            if self.config.test_mode && handle.kind() == SinkKind::Network {
                handle.mark_skipped(&result.ride_id);
                observability::record_sink_dispatch(
                    handle.name(),
                    observability::SinkOutcome::Skipped,
                );
                continue;
            }

            let outcome = handle
                .deliver(Arc::clone(result), self.config.sink_timeout)
                .await;
            observability::record_sink_dispatch(handle.name(), outcome.sink_outcome());
        }
    }

    /// Stop every sink worker, flushing and closing the sinks
    ///
    /// Works through a shared reference, so a dispatcher behind an `Arc`
    /// can be shut down while request tasks still hold clones. Results
    /// processed afterwards are returned but reach no sink.
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        for handle in &self.handles {
            handle.shutdown().await;
        }
        info!("Dispatcher shutdown complete");
    }
}
