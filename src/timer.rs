//! # Timer for one-shot timeouts.
//!
//! [`Timer`] runs every scheduled timeout on a single dedicated
//! [`EventExecutor`], so timeout callbacks never compete with I/O or
//! computation work. Connections use it for command timeouts and reconnect
//! scheduling.
//!
//! ```text
//! new_timeout(delay, f) ──► [pending] ── delay elapsed ──► f() ─► [expired]
//!                               └──── cancel() / stop() ──────► [cancelled]
//! ```
//!
//! `stop()` cancels every pending timeout and terminates the worker; it returns
//! how many timeouts were still pending.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ResourceError;
use crate::executor::EventExecutor;

const PENDING: u8 = 0;
const EXPIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Handle to one scheduled timeout.
#[derive(Debug, Clone)]
pub struct Timeout {
    token: CancellationToken,
    state: Arc<AtomicU8>,
}

impl Timeout {
    /// Cancels the timeout. Returns `false` if it already expired or was cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.token.cancel();
        cancelled
    }

    /// True once the callback has been run.
    pub fn is_expired(&self) -> bool {
        self.state.load(Ordering::Acquire) == EXPIRED
    }

    /// True if the timeout was cancelled (directly or by `Timer::stop`) before expiring.
    pub fn is_cancelled(&self) -> bool {
        match self.state.load(Ordering::Acquire) {
            CANCELLED => true,
            PENDING => self.token.is_cancelled(),
            _ => false,
        }
    }
}

/// Counts one scheduled timeout until its task finishes or is dropped.
struct PendingTimeout(Arc<AtomicUsize>);

impl PendingTimeout {
    fn track(pending: &Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(pending))
    }
}

impl Drop for PendingTimeout {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Single-threaded timer.
pub struct Timer {
    executor: EventExecutor,
    root: CancellationToken,
    pending: Arc<AtomicUsize>,
    stopped: AtomicBool,
}

impl Timer {
    /// Starts the timer worker thread named `name`.
    pub fn new(name: impl Into<Arc<str>>) -> std::io::Result<Self> {
        Ok(Self {
            executor: EventExecutor::spawn(name)?,
            root: CancellationToken::new(),
            pending: Arc::new(AtomicUsize::new(0)),
            stopped: AtomicBool::new(false),
        })
    }

    /// Schedules `task` to run once after `delay`.
    ///
    /// # Errors
    /// [`ResourceError::Rejected`] once the timer is stopped.
    pub fn new_timeout<F>(&self, delay: Duration, task: F) -> Result<Timeout, ResourceError>
    where
        F: FnOnce() + Send + 'static,
    {
        let timeout = Timeout {
            token: self.root.child_token(),
            state: Arc::new(AtomicU8::new(PENDING)),
        };
        let handle = timeout.clone();
        // Released with the task, including when the worker drops it unrun.
        let pending = PendingTimeout::track(&self.pending);

        self.executor.submit(async move {
            let _pending = pending;
            tokio::select! {
                _ = handle.token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if handle
                        .state
                        .compare_exchange(PENDING, EXPIRED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        task();
                    }
                }
            }
        })?;
        Ok(timeout)
    }

    /// Number of timeouts neither expired nor cancelled yet.
    pub fn pending_timeouts(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Cancels all pending timeouts and terminates the worker.
    ///
    /// Returns the number of timeouts that were still pending. Subsequent calls return `0`.
    pub async fn stop(&self) -> usize {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let unprocessed = self.pending_timeouts();
        self.root.cancel();
        self.executor.shutdown_gracefully(Duration::ZERO, Duration::ZERO);
        self.executor.terminated().await;
        debug!(unprocessed, "timer stopped");
        unprocessed
    }

    /// True once `stop()` was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("executor", &self.executor.name())
            .field("pending", &self.pending_timeouts())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
