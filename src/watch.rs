//! Boundary to the resource-watching layer. The engine never watches the
//! API server itself; it consumes change notifications and a lookup-by-key
//! view from one source per resource kind.

use crate::controller::item::MetricKind;

/// A change notification for one watched resource, identified by its
/// `"<namespace>/<name>"` key. Deletions are delivered like any other event
/// so a final cleanup pass runs for the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added { namespace_key: String },
    Updated { namespace_key: String },
    Deleted { namespace_key: String },
}

impl WatchEvent {
    pub fn namespace_key(&self) -> &str {
        match self {
            WatchEvent::Added { namespace_key }
            | WatchEvent::Updated { namespace_key }
            | WatchEvent::Deleted { namespace_key } => namespace_key,
        }
    }
}

pub type EventSubscriber = Box<dyn Fn(&WatchEvent) + Send + Sync>;

/// Capability exposed by a resource watcher for a single kind.
///
/// `has_synced` gates dispatch start-up: workers must not consume items
/// until every registered source reports a complete initial sync.
/// `contains` is the read-only lookup the engine surfaces to handlers so
/// they can reconcile identities whose resource no longer exists.
pub trait MetricSource: Send + Sync + 'static {
    fn kind(&self) -> MetricKind;

    fn has_synced(&self) -> bool;

    fn contains(&self, namespace_key: &str) -> bool;

    /// Registers a callback invoked on the watcher's delivery thread for
    /// every add/update/delete event. Callbacks must not block.
    fn subscribe(&self, subscriber: EventSubscriber);
}
