//! SinkHandle - manages a sink with isolated queue and worker task

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ContractError, PredictionResult, PredictionSink, RideId, SinkKind};
use observability::SinkOutcome;

use crate::metrics::SinkMetrics;

/// One result queued for a sink, with the channel its outcome is reported on
struct Delivery {
    result: Arc<PredictionResult>,
    ack: oneshot::Sender<Result<(), ContractError>>,
}

/// What happened to one delivery
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Sink wrote the result
    Delivered,
    /// Sink returned an error
    Failed(ContractError),
    /// Queue full, result dropped
    Dropped,
    /// No acknowledgement within the sink timeout
    TimedOut,
    /// Worker is gone
    Closed,
}

impl DeliveryOutcome {
    pub fn sink_outcome(&self) -> SinkOutcome {
        match self {
            Self::Delivered => SinkOutcome::Success,
            Self::Failed(_) | Self::Closed => SinkOutcome::Failure,
            Self::Dropped => SinkOutcome::Dropped,
            Self::TimedOut => SinkOutcome::Timeout,
        }
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Network or local sink
    kind: SinkKind,
    /// Channel to send results to worker
    tx: mpsc::Sender<Delivery>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Tells the worker to drain its queue and stop
    stop: Arc<Notify>,
    /// Worker task handle, taken by the first shutdown
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: PredictionSink + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let kind = sink.kind();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let stop = Arc::new(Notify::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_stop = Arc::clone(&stop);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_stop, worker_metrics, worker_name).await;
        });

        Self {
            name,
            kind,
            tx,
            metrics,
            stop,
            worker_handle: Mutex::new(Some(worker_handle)),
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SinkKind {
        self.kind
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Hand a result to the sink and wait for its acknowledgement
    ///
    /// Never blocks on a full queue: the result is dropped instead. The wait
    /// for the acknowledgement is bounded by `timeout`; a late write still
    /// completes in the worker.
    pub async fn deliver(
        &self,
        result: Arc<PredictionResult>,
        timeout: Duration,
    ) -> DeliveryOutcome {
        let ride_id = result.ride_id.clone();
        let (ack, ack_rx) = oneshot::channel();

        match self.tx.try_send(Delivery { result, ack }) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.inc_dropped_count();
                warn!(sink = %self.name, ride_id = %ride_id, "Queue full, result dropped");
                return DeliveryOutcome::Dropped;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.inc_failure_count();
                error!(sink = %self.name, ride_id = %ride_id, "Sink worker closed unexpectedly");
                return DeliveryOutcome::Closed;
            }
        }

        match tokio::time::timeout(timeout, ack_rx).await {
            Ok(Ok(Ok(()))) => DeliveryOutcome::Delivered,
            Ok(Ok(Err(e))) => DeliveryOutcome::Failed(e),
            Ok(Err(_)) => DeliveryOutcome::Closed,
            Err(_) => {
                self.metrics.inc_timeout_count();
                warn!(
                    sink = %self.name,
                    ride_id = %ride_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Sink did not acknowledge in time"
                );
                DeliveryOutcome::TimedOut
            }
        }
    }

    /// Record a delivery suppressed by test mode
    pub fn mark_skipped(&self, ride_id: &RideId) {
        self.metrics.inc_skipped_count();
        debug!(sink = %self.name, ride_id = %ride_id, "Test run, sink skipped");
    }

    /// Shutdown the sink worker gracefully
    ///
    /// Results already queued are written, then the sink is flushed and
    /// closed. Later deliveries report `Closed`. Calling it again is a no-op.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(&self) {
        self.stop.notify_one();

        let worker = match self.worker_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(worker) = worker else {
            debug!(sink = %self.name, "Sink already shut down");
            return;
        };

        if let Err(e) = worker.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that consumes results and writes to sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, stop, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: PredictionSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Delivery>,
    stop: Arc<Notify>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    loop {
        let Delivery { result, ack } = tokio::select! {
            biased;
            delivery = rx.recv() => match delivery {
                Some(delivery) => delivery,
                None => break,
            },
            _ = stop.notified() => {
                // Refuse new results; queued ones still come out of recv()
                rx.close();
                continue;
            }
        };
        metrics.set_queue_len(rx.len());

        let outcome = sink.write(&result).await;
        match &outcome {
            Ok(()) => {
                metrics.inc_write_count();
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    sink = %name,
                    ride_id = %result.ride_id,
                    error = %e,
                    "Write failed"
                );
            }
        }

        // Dispatcher may have stopped waiting
        let _ = ack.send(outcome);
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}
