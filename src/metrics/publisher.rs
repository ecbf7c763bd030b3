//! # Periodic latency event publisher.
//!
//! Every `emit_interval` the publisher retrieves a snapshot from the collector
//! and publishes it as an [`EventKind::CommandLatency`](crate::EventKind::CommandLatency)
//! event. It runs as one task on a computation executor.
//!
//! ```text
//! start() ──► [interval tick] ──► collector.retrieve_metrics() ──► bus.publish(CommandLatency)
//!                  ▲                                                   │
//!                  └───────────────────────────────────────────────────┘
//! shutdown() ──► cancel ──► task exits
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CommandLatencyCollector, CommandLatencyPublisherOptions};
use crate::error::ResourceError;
use crate::events::{Event, EventBus};
use crate::executor::EventExecutor;

/// Handle to a running latency publisher.
pub struct CommandLatencyEventPublisher {
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CommandLatencyEventPublisher {
    /// Starts publishing on `executor`.
    ///
    /// Returns `Ok(None)` when publishing is disabled by `options` or the
    /// collector is not enabled.
    pub fn start(
        executor: &EventExecutor,
        bus: Arc<dyn EventBus>,
        collector: Arc<dyn CommandLatencyCollector>,
        options: &CommandLatencyPublisherOptions,
    ) -> Result<Option<Self>, ResourceError> {
        if !options.is_enabled() || !collector.is_enabled() {
            return Ok(None);
        }
        let period = options.emit_interval;
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = executor.submit(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if !collector.is_enabled() {
                            continue;
                        }
                        bus.publish(Event::command_latency(collector.retrieve_metrics()));
                    }
                }
            }
        })?;

        debug!(?period, "command latency publisher started");
        Ok(Some(Self {
            token,
            task: Mutex::new(Some(task)),
        }))
    }

    /// True until [`shutdown`](Self::shutdown) was called.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stops publishing and waits for the task to exit. Idempotent.
    pub async fn shutdown(&self) {
        self.token.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            // A cancelled join (executor already gone) is fine here.
            let _ = task.await;
            debug!("command latency publisher stopped");
        }
    }
}

impl std::fmt::Debug for CommandLatencyEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandLatencyEventPublisher")
            .field("running", &self.is_running())
            .finish()
    }
}
