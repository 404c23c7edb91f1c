use crate::controller::item::WorkItem;
use crate::queue::rate_limiter::RateLimiter;
use crate::queue::work_queue::WorkQueue;
use crate::runtime::telemetry::Telemetry;
use crate::watch::MetricSource;
use std::sync::Arc;

/// Subscribes one enqueue callback on `source`.
///
/// Every add/update/delete event becomes the canonical work item for the
/// source's kind and is rate-limited onto the queue; suppressing churn is
/// the queue's deduplication job, not the adapter's, so nothing is
/// filtered. The callback only bumps the limiter and books a (possibly
/// delayed) insertion, so it returns immediately on the watcher's delivery
/// thread.
pub(crate) fn install_adapter(
    source: &dyn MetricSource,
    queue: WorkQueue<String>,
    limiter: Arc<RateLimiter<WorkItem>>,
    telemetry: Arc<Telemetry>,
) {
    let kind = source.kind();
    source.subscribe(Box::new(move |event| {
        let item = WorkItem::new(kind, event.namespace_key());
        let delay = limiter.next_delay(&item);
        tracing::debug!(
            key = %item.namespace_key(),
            kind = %item.kind(),
            delay = ?delay,
            "enqueueing watch event"
        );
        queue.add_after(item.queue_key(), delay);
        telemetry.record_enqueued();
    }));
}
