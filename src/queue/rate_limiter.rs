use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Maps an identity's attempt count to the delay before its next run.
///
/// Implementations must be deterministic in the attempt count; the limiter
/// owns all per-identity state.
pub trait RetryPolicy: Send + Sync + 'static {
    fn delay(&self, attempts: u32) -> Duration;
}

/// Doubling backoff: `base * 2^(attempts - 1)`, capped at `max`.
///
/// A zero base yields zero delays for every attempt, which keeps retries
/// immediate for latency-sensitive embedders and deterministic tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn delay(&self, attempts: u32) -> Duration {
        if self.base.is_zero() || attempts == 0 {
            return Duration::ZERO;
        }
        let doublings = 2u32.saturating_pow(attempts.saturating_sub(1));
        self.base.saturating_mul(doublings).min(self.max)
    }
}

/// Tracks attempt counts per identity and derives retry delays from the
/// configured [`RetryPolicy`].
///
/// Safe under concurrent callers; calls for the same identity serialize on
/// the internal lock.
pub struct RateLimiter<T> {
    attempts: Mutex<HashMap<T, u32>>,
    policy: Arc<dyn RetryPolicy>,
}

impl<T: Clone + Eq + Hash> RateLimiter<T> {
    pub fn new(policy: Arc<dyn RetryPolicy>) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Records another attempt for `item` and returns the delay before it
    /// should next become eligible.
    pub fn next_delay(&self, item: &T) -> Duration {
        let mut attempts = self.attempts.lock().unwrap();
        let count = attempts.entry(item.clone()).or_insert(0);
        *count += 1;
        self.policy.delay(*count)
    }

    /// Resets the attempt count for `item`. Called on success and on the
    /// terminal give-up so a future fresh event starts a new budget.
    pub fn forget(&self, item: &T) {
        self.attempts.lock().unwrap().remove(item);
    }

    /// Attempts recorded so far for `item`.
    pub fn attempts(&self, item: &T) -> u32 {
        self.attempts.lock().unwrap().get(item).copied().unwrap_or(0)
    }
}
