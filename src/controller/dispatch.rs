use crate::controller::enqueue::install_adapter;
use crate::controller::handler::MetricHandler;
use crate::controller::item::WorkItem;
use crate::queue::rate_limiter::{ExponentialBackoff, RateLimiter, RetryPolicy};
use crate::queue::work_queue::WorkQueue;
use crate::runtime::config::ControllerConfig;
use crate::runtime::telemetry::Telemetry;
use crate::watch::MetricSource;
use anyhow::Error as AnyError;
use std::sync::Arc;

/// The reconciliation engine: one queue fed by an enqueue adapter per
/// watched source, drained one item per tick by [`Controller::process_next`].
pub struct Controller {
    queue: WorkQueue<String>,
    limiter: Arc<RateLimiter<WorkItem>>,
    handler: Arc<dyn MetricHandler>,
    sources: Vec<Arc<dyn MetricSource>>,
    telemetry: Arc<Telemetry>,
    max_attempts: u32,
}

impl Controller {
    /// Wires queue, rate limiter, and one enqueue adapter per source, using
    /// the exponential backoff policy from `config`.
    ///
    /// Must be called inside a tokio runtime (the queue owns delay timers).
    pub fn new(
        config: &ControllerConfig,
        sources: Vec<Arc<dyn MetricSource>>,
        handler: Arc<dyn MetricHandler>,
    ) -> Self {
        let policy = Arc::new(ExponentialBackoff::new(
            config.backoff_base(),
            config.backoff_max(),
        ));
        Self::with_policy(config, sources, handler, policy)
    }

    /// Variant of [`Controller::new`] with a caller-supplied retry policy.
    pub fn with_policy(
        config: &ControllerConfig,
        sources: Vec<Arc<dyn MetricSource>>,
        handler: Arc<dyn MetricHandler>,
        policy: Arc<dyn RetryPolicy>,
    ) -> Self {
        let queue = WorkQueue::new();
        let limiter = Arc::new(RateLimiter::new(policy));
        let telemetry = Arc::new(Telemetry::default());

        for source in &sources {
            install_adapter(
                source.as_ref(),
                queue.clone(),
                limiter.clone(),
                telemetry.clone(),
            );
        }

        Self {
            queue,
            limiter,
            handler,
            sources,
            telemetry,
            max_attempts: config.max_attempts(),
        }
    }

    /// True once every registered source reports a complete initial sync.
    pub fn has_synced(&self) -> bool {
        self.sources.iter().all(|source| source.has_synced())
    }

    /// Whether the resource behind `item` still exists in its watcher's
    /// local cache. Handlers use this to run delete-tolerant cleanup.
    pub fn resource_exists(&self, item: &WorkItem) -> bool {
        self.sources
            .iter()
            .filter(|source| source.kind() == item.kind())
            .any(|source| source.contains(item.namespace_key()))
    }

    /// The shared work queue; also the queue-depth observability handle.
    pub fn queue(&self) -> &WorkQueue<String> {
        &self.queue
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Attempts recorded for `item` so far (enqueues plus failed runs).
    pub fn attempts(&self, item: &WorkItem) -> u32 {
        self.limiter.attempts(item)
    }

    /// Runs one dispatch tick: pop, decode, process, and apply the
    /// retry/drop policy. Returns `false` only when the queue has shut
    /// down; every processing outcome, including errors, keeps the loop
    /// running.
    pub async fn process_next(&self) -> bool {
        let Some(raw) = self.queue.get().await else {
            tracing::info!("work queue shut down; stopping dispatch");
            return false;
        };

        // Released on every exit path, including handler panics; a stuck
        // in-flight marker would block this identity forever.
        let _in_flight = InFlightGuard {
            queue: &self.queue,
            key: &raw,
        };

        let item = match WorkItem::decode(&raw) {
            Ok(item) => item,
            Err(error) => {
                self.telemetry.record_decode_failure();
                tracing::error!(
                    raw = %raw,
                    error = %error,
                    "discarding queue entry that is not a valid work item"
                );
                return true;
            }
        };

        tracing::debug!(key = %item.namespace_key(), kind = %item.kind(), "processing work item");
        match self.handler.process(item.clone()).await {
            Ok(()) => {
                self.limiter.forget(&item);
                self.telemetry.record_processed();
                tracing::debug!(key = %item.namespace_key(), kind = %item.kind(), "item reconciled");
            }
            Err(error) => self.retry_or_drop(&item, &error),
        }

        true
    }

    fn retry_or_drop(&self, item: &WorkItem, error: &AnyError) {
        self.telemetry.record_handler_error();
        let attempts = self.limiter.attempts(item);

        if attempts < self.max_attempts {
            let delay = self.limiter.next_delay(item);
            self.telemetry.record_retry();
            tracing::warn!(
                key = %item.namespace_key(),
                kind = %item.kind(),
                attempts,
                delay = ?delay,
                error = %error,
                "processing failed; scheduling retry"
            );
            self.queue.add_after(item.queue_key(), delay);
        } else {
            self.limiter.forget(item);
            self.telemetry.record_dropped();
            tracing::error!(
                key = %item.namespace_key(),
                kind = %item.kind(),
                attempts,
                error = %error,
                "attempt budget exhausted; dropping item permanently"
            );
        }
    }
}

struct InFlightGuard<'a> {
    queue: &'a WorkQueue<String>,
    key: &'a String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.queue.done(self.key);
    }
}
