pub mod controller;
pub mod queue;
pub mod runtime;
pub mod watch;

pub use controller::dispatch::Controller;
pub use controller::handler::{MetricHandler, ProcessFuture};
pub use controller::item::{DecodeError, MetricKind, WorkItem};
pub use queue::rate_limiter::{ExponentialBackoff, RateLimiter, RetryPolicy};
pub use queue::work_queue::WorkQueue;
pub use runtime::config::{ControllerConfig, ControllerConfigBuilder};
pub use runtime::runner::Runner;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use watch::{EventSubscriber, MetricSource, WatchEvent};
