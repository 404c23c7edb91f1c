use crate::controller::item::WorkItem;
use anyhow::Error as AnyError;
use core::future::Future;
use core::pin::Pin;

pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<(), AnyError>> + Send + 'static>>;

/// Trait implemented by the embedding application to reconcile one watched
/// identity.
///
/// Invoked by worker tasks, always async so it can perform I/O such as
/// calling a monitoring backend. It must be safe to call concurrently for
/// different items; the queue guarantees the same identity is never
/// processed by two workers at once. A returned error schedules a retry
/// under the attempt budget, so the implementation should be reentrant-safe
/// for the same identity across sequential attempts.
pub trait MetricHandler: Send + Sync + 'static {
    fn process(&self, item: WorkItem) -> ProcessFuture;
}
