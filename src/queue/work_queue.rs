use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::sleep;

struct QueueState<T> {
    /// Entries ready to be handed to a worker, in arrival order.
    ready: VecDeque<T>,
    /// Identities with a run booked: ready entries plus re-adds that arrived
    /// while the identity was in flight.
    dirty: HashSet<T>,
    /// Identities handed out by `get` and not yet released by `done`.
    processing: HashSet<T>,
    /// Identities waiting out a delay, mapped to their schedule generation.
    delayed: HashMap<T, u64>,
    next_generation: u64,
    shutting_down: bool,
}

impl<T> QueueState<T> {
    fn new() -> Self {
        Self {
            ready: VecDeque::new(),
            dirty: HashSet::new(),
            processing: HashSet::new(),
            delayed: HashMap::new(),
            next_generation: 0,
            shutting_down: false,
        }
    }
}

struct Inner<T> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
}

impl<T: Clone + Eq + Hash> Inner<T> {
    /// Books a run for `item`. Returns true if a ready entry was pushed and
    /// waiters should be woken.
    fn book(state: &mut QueueState<T>, item: T) -> bool {
        if state.dirty.contains(&item) {
            return false;
        }
        state.dirty.insert(item.clone());
        if state.processing.contains(&item) {
            return false;
        }
        state.ready.push_back(item);
        true
    }

    fn add(&self, item: T) {
        let pushed = {
            let mut state = self.state.lock().unwrap();
            if state.shutting_down {
                return;
            }
            // An immediate add supersedes any pending delayed schedule.
            state.delayed.remove(&item);
            Self::book(&mut state, item)
        };
        if pushed {
            self.notify.notify_waiters();
        }
    }

    fn fire_delayed(&self, item: T, generation: u64) {
        let pushed = {
            let mut state = self.state.lock().unwrap();
            if state.shutting_down {
                return;
            }
            if state.delayed.get(&item) != Some(&generation) {
                // Superseded by a later schedule or an immediate add.
                return;
            }
            state.delayed.remove(&item);
            Self::book(&mut state, item)
        };
        if pushed {
            self.notify.notify_waiters();
        }
    }
}

/// Deduplicating, delay-aware work queue.
///
/// Identities are collapsed while a run is pending, and an identity handed to
/// a worker is never handed out again until [`WorkQueue::done`] releases it;
/// events arriving in between are merged into a single follow-up run. Delayed
/// re-adds wait out their full delay from the most recent scheduling instant,
/// and an identity whose delay expires while it is still in flight becomes
/// ready the moment `done` runs.
///
/// All operations except [`WorkQueue::get`] are synchronous and safe to call
/// from arbitrary threads. The queue captures the current tokio runtime for
/// its delay timers, so it must be constructed inside one.
pub struct WorkQueue<T> {
    inner: Arc<Inner<T>>,
    timers: Handle,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            timers: self.timers.clone(),
        }
    }
}

impl<T: Clone + Eq + Hash + Send + 'static> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::new()),
                notify: Notify::new(),
            }),
            timers: Handle::current(),
        }
    }

    /// Inserts `item` unless a run for it is already booked. No-op after
    /// shutdown.
    pub fn add(&self, item: T) {
        self.inner.add(item);
    }

    /// Schedules `item` to be inserted once `delay` elapses.
    ///
    /// A later schedule for the same identity resets the delay rather than
    /// stacking, and an already-booked run absorbs the schedule entirely. A
    /// zero delay degenerates to [`WorkQueue::add`].
    pub fn add_after(&self, item: T, delay: Duration) {
        if delay.is_zero() {
            self.add(item);
            return;
        }

        let generation = {
            let mut state = self.inner.state.lock().unwrap();
            if state.shutting_down || state.dirty.contains(&item) {
                return;
            }
            state.next_generation += 1;
            let generation = state.next_generation;
            state.delayed.insert(item.clone(), generation);
            generation
        };

        let inner = Arc::downgrade(&self.inner);
        self.timers.spawn(async move {
            sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.fire_delayed(item, generation);
            }
        });
    }

    /// Waits for the next entry, marking it in flight. Returns `None` once
    /// the queue has been shut down and drained; entries still queued at
    /// shutdown are handed out first.
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.inner.state.lock().unwrap();
                if let Some(item) = state.ready.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    return Some(item);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Releases the in-flight marker for `item`. If a run was booked while
    /// the item was in flight it becomes ready immediately.
    pub fn done(&self, item: &T) {
        let pushed = {
            let mut state = self.inner.state.lock().unwrap();
            state.processing.remove(item);
            if state.dirty.contains(item) {
                state.ready.push_back(item.clone());
                true
            } else {
                false
            }
        };
        if pushed {
            self.inner.notify.notify_waiters();
        }
    }

    /// Entries not yet handed to a worker: ready plus delayed, excluding
    /// in-flight.
    pub fn len(&self) -> usize {
        let state = self.inner.state.lock().unwrap();
        state.ready.len() + state.delayed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wakes every blocked [`WorkQueue::get`] and turns subsequent adds into
    /// no-ops. Delayed schedules are discarded.
    pub fn shut_down(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.shutting_down = true;
            state.delayed.clear();
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.state.lock().unwrap().shutting_down
    }
}

impl<T: Clone + Eq + Hash + Send + 'static> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
