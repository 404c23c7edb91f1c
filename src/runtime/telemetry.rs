use crate::queue::work_queue::WorkQueue;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls
/// back to `info`. Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters for the dispatch engine.
///
/// `items_dropped` counts identities abandoned after the attempt budget;
/// together with `items_processed` it makes permanent failure
/// distinguishable from success in observability output.
#[derive(Default, Debug)]
pub struct Telemetry {
    items_enqueued: AtomicU64,
    items_processed: AtomicU64,
    handler_errors: AtomicU64,
    retries_scheduled: AtomicU64,
    items_dropped: AtomicU64,
    decode_failures: AtomicU64,
}

impl Telemetry {
    pub fn record_enqueued(&self) {
        self.items_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.items_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.items_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_enqueued(&self) -> u64 {
        self.items_enqueued.load(Ordering::Relaxed)
    }

    pub fn items_processed(&self) -> u64 {
        self.items_processed.load(Ordering::Relaxed)
    }

    pub fn handler_errors(&self) -> u64 {
        self.handler_errors.load(Ordering::Relaxed)
    }

    pub fn retries_scheduled(&self) -> u64 {
        self.retries_scheduled.load(Ordering::Relaxed)
    }

    pub fn items_dropped(&self) -> u64 {
        self.items_dropped.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            items_enqueued: self.items_enqueued(),
            items_processed: self.items_processed(),
            handler_errors: self.handler_errors(),
            retries_scheduled: self.retries_scheduled(),
            items_dropped: self.items_dropped(),
            decode_failures: self.decode_failures(),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TelemetrySnapshot {
    pub items_enqueued: u64,
    pub items_processed: u64,
    pub handler_errors: u64,
    pub retries_scheduled: u64,
    pub items_dropped: u64,
    pub decode_failures: u64,
}

/// Spawns a background task that periodically logs counters and the current
/// queue depth, so backlog growth and stuck identities are visible.
pub fn spawn_metrics_reporter<T: Clone + Eq + Hash + Send + 'static>(
    telemetry: Arc<Telemetry>,
    queue: WorkQueue<T>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "metricsync::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = telemetry.snapshot();
                    let queue_depth = queue.len();

                    tracing::info!(
                        target: "metricsync::metrics",
                        queue_depth,
                        enqueued = snapshot.items_enqueued,
                        processed = snapshot.items_processed,
                        handler_errors = snapshot.handler_errors,
                        retries = snapshot.retries_scheduled,
                        dropped = snapshot.items_dropped,
                        decode_failures = snapshot.decode_failures,
                        "dispatch metrics snapshot"
                    );
                }
            }
        }
    })
}
