use crate::controller::dispatch::Controller;
use crate::controller::handler::MetricHandler;
use crate::runtime::config::ControllerConfig;
use crate::runtime::telemetry::spawn_metrics_reporter;
use crate::watch::MetricSource;
use anyhow::{bail, Result};
use futures::FutureExt;
use std::any::Any;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Coordinates the dispatch lifecycle: gates start-up on watcher sync,
/// runs the worker tasks, and handles OS signals for graceful shutdowns.
///
/// A runner is single-shot: once stopped, its queue stays shut down and a
/// fresh runner must be built to resume processing.
pub struct Runner {
    controller: Arc<Controller>,
    config: ControllerConfig,
    shutdown: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    reporter: Option<JoinHandle<()>>,
    started: bool,
}

impl Runner {
    /// Builds the controller from one source per watched kind and the
    /// embedder's processing handler, and wires a root [`CancellationToken`]
    /// that propagates through queue and workers.
    pub fn new(
        config: ControllerConfig,
        sources: Vec<Arc<dyn MetricSource>>,
        handler: Arc<dyn MetricHandler>,
    ) -> Self {
        let controller = Arc::new(Controller::new(&config, sources, handler));
        Self {
            controller,
            config,
            shutdown: CancellationToken::new(),
            workers: Vec::new(),
            reporter: None,
            started: false,
        }
    }

    pub fn controller(&self) -> Arc<Controller> {
        self.controller.clone()
    }

    /// Returns a clone of the root shutdown token so external callers can
    /// integrate with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Waits for every watcher cache to sync, then spawns the worker tasks
    /// and the metrics reporter.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        self.wait_for_sync().await?;

        for worker_id in 0..self.config.workers() {
            let controller = self.controller.clone();
            self.workers
                .push(tokio::spawn(worker_loop(worker_id, controller)));
        }

        self.reporter = Some(spawn_metrics_reporter(
            self.controller.telemetry(),
            self.controller.queue().clone(),
            self.shutdown.clone(),
            self.config.metrics_interval(),
        ));

        let queue = self.controller.queue().clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            queue.shut_down();
        });

        self.started = true;
        tracing::info!(workers = self.config.workers(), "dispatch workers started");
        Ok(())
    }

    /// Stops processing: cancels the root token, shuts the queue down, and
    /// joins every task.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }

        self.shutdown.cancel();
        self.controller.queue().shut_down();

        for handle in self.workers.drain(..) {
            let _ = handle.await;
        }
        if let Some(reporter) = self.reporter.take() {
            let _ = reporter.await;
        }

        self.started = false;
        tracing::info!("runner stopped");
        Ok(())
    }

    /// Runs until a Ctrl-C (SIGINT) is received or the shutdown token is
    /// cancelled elsewhere.
    pub async fn run_until_ctrl_c(&mut self) -> Result<()> {
        self.start().await?;
        tracing::info!("runner started; waiting for Ctrl-C (SIGINT) to initiate shutdown");

        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; shutting down runner");
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("runner shutdown token cancelled");
            }
        }

        self.stop().await
    }

    async fn wait_for_sync(&self) -> Result<()> {
        let poll = self.config.sync_poll_interval();
        loop {
            if self.controller.has_synced() {
                tracing::info!("watcher caches synced");
                return Ok(());
            }
            tracing::debug!("waiting for watcher caches to sync");

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    bail!("shutdown requested before watcher caches synced");
                }
                _ = sleep(poll) => {}
            }
        }
    }
}

async fn worker_loop(worker_id: usize, controller: Arc<Controller>) {
    tracing::info!(worker = worker_id, "dispatch worker started");

    loop {
        let tick = std::panic::AssertUnwindSafe(controller.process_next())
            .catch_unwind()
            .await;

        match tick {
            Ok(true) => {}
            Ok(false) => break,
            Err(panic_payload) => {
                // The in-flight marker was already released during unwind;
                // a panicking handler must not take the worker down with it.
                tracing::error!(
                    worker = worker_id,
                    panic = %panic_message(panic_payload.as_ref()),
                    "processing handler panicked; continuing with next item"
                );
            }
        }
    }

    tracing::info!(worker = worker_id, "dispatch worker exited");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
