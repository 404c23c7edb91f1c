use crate::runtime::telemetry;
use anyhow::{bail, Result};
use std::time::Duration;

const DEFAULT_WORKERS: usize = 2;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(5);
const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(1000);
const DEFAULT_SYNC_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runtime configuration for the reconciliation engine.
///
/// Construct via [`ControllerConfig::builder`] so invariants are validated
/// before any consumer observes the values; the plain [`Default`] instance
/// carries the documented defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    workers: usize,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    sync_poll_interval: Duration,
    metrics_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            sync_poll_interval: DEFAULT_SYNC_POLL_INTERVAL,
            metrics_interval: telemetry::DEFAULT_METRICS_INTERVAL,
        }
    }
}

impl ControllerConfig {
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder::default()
    }

    /// Number of concurrent dispatch worker tasks.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Attempt budget per identity before it is permanently dropped.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// First retry delay; zero means immediate retries.
    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    /// Upper bound on the doubling retry delay.
    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }

    /// Poll period while waiting for watcher caches to sync.
    pub fn sync_poll_interval(&self) -> Duration {
        self.sync_poll_interval
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be greater than 0");
        }

        if self.max_attempts == 0 {
            bail!("max_attempts must be greater than 0");
        }

        if self.backoff_max < self.backoff_base {
            bail!("backoff_max must be at least backoff_base");
        }

        if self.sync_poll_interval.is_zero() {
            bail!("sync_poll_interval must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct ControllerConfigBuilder {
    workers: Option<usize>,
    max_attempts: Option<u32>,
    backoff_base: Option<Duration>,
    backoff_max: Option<Duration>,
    sync_poll_interval: Option<Duration>,
    metrics_interval: Option<Duration>,
}

impl ControllerConfigBuilder {
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = Some(base);
        self
    }

    pub fn backoff_max(mut self, max: Duration) -> Self {
        self.backoff_max = Some(max);
        self
    }

    pub fn sync_poll_interval(mut self, interval: Duration) -> Self {
        self.sync_poll_interval = Some(interval);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<ControllerConfig> {
        let config = ControllerConfig {
            workers: self.workers.unwrap_or(DEFAULT_WORKERS),
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            backoff_base: self.backoff_base.unwrap_or(DEFAULT_BACKOFF_BASE),
            backoff_max: self.backoff_max.unwrap_or(DEFAULT_BACKOFF_MAX),
            sync_poll_interval: self
                .sync_poll_interval
                .unwrap_or(DEFAULT_SYNC_POLL_INTERVAL),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        config.validate()?;
        Ok(config)
    }
}
