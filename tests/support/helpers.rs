use anyhow::{bail, Result};
use metricsync::ControllerConfig;
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

/// Immediate retries so tick counts map one-to-one onto scenario steps.
pub fn zero_backoff_config() -> ControllerConfig {
    ControllerConfig::builder()
        .backoff_base(Duration::ZERO)
        .backoff_max(Duration::ZERO)
        .build()
        .expect("config should build")
}

/// Polls `condition` until it holds or `deadline` passes.
pub async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> Result<()> {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return Ok(());
        }
        sleep(Duration::from_millis(10)).await;
    }
    bail!("condition not met within {deadline:?}")
}
