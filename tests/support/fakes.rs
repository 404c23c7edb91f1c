use anyhow::anyhow;
use metricsync::{
    Controller, EventSubscriber, MetricHandler, MetricKind, MetricSource, ProcessFuture,
    WatchEvent, WorkItem,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory stand-in for a resource watcher: an indexed store of live keys
/// plus synchronous event delivery to whatever the engine subscribed.
///
/// The sync check is an injected predicate so tests choose between an
/// always-synced source and one they flip at a precise moment.
pub struct FakeMetricSource {
    kind: MetricKind,
    synced: Box<dyn Fn() -> bool + Send + Sync>,
    store: Mutex<HashSet<String>>,
    subscribers: Mutex<Vec<EventSubscriber>>,
}

impl FakeMetricSource {
    pub fn always_synced(kind: MetricKind) -> Arc<Self> {
        Self::with_sync_predicate(kind, || true)
    }

    pub fn with_sync_predicate(
        kind: MetricKind,
        predicate: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            synced: Box::new(predicate),
            store: Mutex::new(HashSet::new()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn insert(&self, namespace_key: &str) {
        self.store.lock().unwrap().insert(namespace_key.to_string());
        self.emit(WatchEvent::Added {
            namespace_key: namespace_key.to_string(),
        });
    }

    pub fn update(&self, namespace_key: &str) {
        self.emit(WatchEvent::Updated {
            namespace_key: namespace_key.to_string(),
        });
    }

    pub fn delete(&self, namespace_key: &str) {
        self.store.lock().unwrap().remove(namespace_key);
        self.emit(WatchEvent::Deleted {
            namespace_key: namespace_key.to_string(),
        });
    }

    fn emit(&self, event: WatchEvent) {
        for subscriber in self.subscribers.lock().unwrap().iter() {
            subscriber(&event);
        }
    }
}

impl MetricSource for FakeMetricSource {
    fn kind(&self) -> MetricKind {
        self.kind
    }

    fn has_synced(&self) -> bool {
        (self.synced)()
    }

    fn contains(&self, namespace_key: &str) -> bool {
        self.store.lock().unwrap().contains(namespace_key)
    }

    fn subscribe(&self, subscriber: EventSubscriber) {
        self.subscribers.lock().unwrap().push(subscriber);
    }
}

/// Handler that reconciles everything successfully and remembers what it saw.
#[derive(Default)]
pub struct RecordingHandler {
    processed: Mutex<Vec<WorkItem>>,
}

impl RecordingHandler {
    pub fn processed(&self) -> Vec<WorkItem> {
        self.processed.lock().unwrap().clone()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.lock().unwrap().len()
    }
}

impl MetricHandler for RecordingHandler {
    fn process(&self, item: WorkItem) -> ProcessFuture {
        self.processed.lock().unwrap().push(item);
        Box::pin(async { Ok(()) })
    }
}

/// Handler that fails every attempt.
#[derive(Default)]
pub struct FailingHandler {
    calls: AtomicUsize,
}

impl FailingHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetricHandler for FailingHandler {
    fn process(&self, _item: WorkItem) -> ProcessFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(anyhow!("this handler always fails")) })
    }
}

/// Handler that records whether each reconciled identity still exists in
/// its watcher cache, for delete-tolerant cleanup scenarios.
#[derive(Default)]
pub struct ExistenceProbeHandler {
    controller: Mutex<Option<Arc<Controller>>>,
    observed: Mutex<Vec<(WorkItem, bool)>>,
}

impl ExistenceProbeHandler {
    pub fn attach(&self, controller: Arc<Controller>) {
        *self.controller.lock().unwrap() = Some(controller);
    }

    pub fn observed(&self) -> Vec<(WorkItem, bool)> {
        self.observed.lock().unwrap().clone()
    }
}

impl MetricHandler for ExistenceProbeHandler {
    fn process(&self, item: WorkItem) -> ProcessFuture {
        let exists = self
            .controller
            .lock()
            .unwrap()
            .as_ref()
            .map(|controller| controller.resource_exists(&item))
            .unwrap_or(false);
        self.observed.lock().unwrap().push((item, exists));
        Box::pin(async { Ok(()) })
    }
}
