//! # Single-threaded event executor.
//!
//! An [`EventExecutor`] is one dedicated OS thread driving a current-thread
//! tokio runtime. Work is submitted from any thread through the runtime handle;
//! the worker runs it until a graceful shutdown drains it.
//!
//! ## Lifecycle
//! ```text
//! spawn() ──► [running] ── shutdown_gracefully(quiet, timeout) ──► [shutting down]
//!                                                                     │
//!        drain loop:                                                  │
//!          ├─ no pending tasks and idle ≥ quiet  ─► exit              │
//!          └─ deadline (timeout) reached         ─► exit, drop rest   │
//!                                                                     ▼
//!                                               runtime dropped ─► [terminated]
//! ```
//!
//! ## Rules
//! - Submissions after `shutdown_gracefully` are rejected.
//! - A submit or a task completion restarts the quiet period.
//! - Tasks still pending at the deadline are dropped (cancelled at their next `.await`).
//! - Dropping the executor without a shutdown terminates it immediately.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ResourceError;

/// How often the drain loop re-checks the quiet period.
const DRAIN_TICK: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, Default)]
struct ShutdownParams {
    quiet_period: Duration,
    timeout: Duration,
}

/// State shared between the executor handle and its worker thread.
struct WorkerState {
    shutdown: CancellationToken,
    terminated: CancellationToken,
    params: OnceLock<ShutdownParams>,
    pending: AtomicUsize,
    last_activity: Mutex<Instant>,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            terminated: CancellationToken::new(),
            params: OnceLock::new(),
            pending: AtomicUsize::new(0),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Waits for a shutdown request, then for the queue to drain or the deadline.
    async fn drain(&self, name: &str) {
        self.shutdown.cancelled().await;
        let ShutdownParams {
            quiet_period,
            timeout,
        } = self.params.get().copied().unwrap_or_default();
        // The quiet period never starts before the shutdown request.
        self.touch();
        let deadline = Instant::now().checked_add(timeout);

        loop {
            let now = Instant::now();
            let pending = self.pending.load(Ordering::Acquire);
            if deadline.is_some_and(|d| now >= d) {
                if pending > 0 {
                    warn!(executor = name, pending, "shutdown timeout reached; dropping pending tasks");
                }
                break;
            }
            if pending == 0 && self.idle_for() >= quiet_period {
                break;
            }
            let tick = deadline.map_or(DRAIN_TICK, |d| DRAIN_TICK.min(d - now));
            tokio::time::sleep(tick).await;
        }
    }
}

/// Keeps the pending counter accurate whether a task completes or is dropped.
struct PendingGuard(Arc<WorkerState>);

impl PendingGuard {
    fn new(state: Arc<WorkerState>) -> Self {
        state.pending.fetch_add(1, Ordering::AcqRel);
        state.touch();
        Self(state)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.touch();
        self.0.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One worker thread with its own runtime.
pub struct EventExecutor {
    name: Arc<str>,
    handle: Handle,
    state: Arc<WorkerState>,
}

impl EventExecutor {
    /// Starts a worker thread named `name`.
    ///
    /// Does not require an ambient tokio runtime.
    pub fn spawn(name: impl Into<Arc<str>>) -> io::Result<Self> {
        let name = name.into();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        let state = Arc::new(WorkerState::new());

        let worker_state = Arc::clone(&state);
        let worker_name = Arc::clone(&name);
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                runtime.block_on(worker_state.drain(&worker_name));
                // Unfinished tasks are dropped together with the runtime.
                drop(runtime);
                debug!(executor = %worker_name, "executor terminated");
                worker_state.terminated.cancel();
            })?;

        Ok(Self {
            name,
            handle,
            state,
        })
    }

    /// Thread name of this executor.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submits a future for execution on this worker.
    ///
    /// # Errors
    /// [`ResourceError::Rejected`] once a shutdown was requested.
    pub fn submit<F>(&self, fut: F) -> Result<JoinHandle<F::Output>, ResourceError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_shutting_down() {
            return Err(ResourceError::Rejected {
                executor: Arc::clone(&self.name),
            });
        }
        let guard = PendingGuard::new(Arc::clone(&self.state));
        Ok(self.handle.spawn(async move {
            let _guard = guard;
            fut.await
        }))
    }

    /// Submits a blocking-free closure for execution on this worker.
    pub fn execute<F>(&self, f: F) -> Result<JoinHandle<()>, ResourceError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(async move { f() })
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn pending_tasks(&self) -> usize {
        self.state.pending.load(Ordering::Acquire)
    }

    /// Requests a graceful shutdown. Only the first request's parameters apply.
    pub fn shutdown_gracefully(&self, quiet_period: Duration, timeout: Duration) {
        let _ = self.state.params.set(ShutdownParams {
            quiet_period,
            timeout,
        });
        self.state.shutdown.cancel();
    }

    /// Completes once the worker thread has dropped its runtime.
    pub async fn terminated(&self) {
        self.state.terminated.cancelled().await;
    }

    /// True once a shutdown was requested.
    pub fn is_shutting_down(&self) -> bool {
        self.state.shutdown.is_cancelled()
    }

    /// True once the worker has terminated.
    pub fn is_terminated(&self) -> bool {
        self.state.terminated.is_cancelled()
    }
}

impl Drop for EventExecutor {
    fn drop(&mut self) {
        // No-op if a graceful shutdown was already requested.
        self.shutdown_gracefully(Duration::ZERO, Duration::ZERO);
    }
}

impl std::fmt::Debug for EventExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventExecutor")
            .field("name", &self.name)
            .field("pending", &self.pending_tasks())
            .field("shutting_down", &self.is_shutting_down())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn test_submit_runs_on_worker_thread() {
        let exec = EventExecutor::spawn("test-worker").expect("spawn");
        let name = exec
            .submit(async { std::thread::current().name().map(str::to_owned) })
            .expect("submit")
            .await
            .expect("join");
        assert_eq!(name.as_deref(), Some("test-worker"));

        exec.shutdown_gracefully(Duration::ZERO, Duration::ZERO);
        exec.terminated().await;
        assert!(exec.is_terminated());
    }

    #[tokio::test]
    async fn test_rejects_after_shutdown() {
        let exec = EventExecutor::spawn("test-reject").expect("spawn");
        exec.shutdown_gracefully(Duration::ZERO, Duration::ZERO);
        let err = exec.execute(|| {}).expect_err("must reject");
        assert!(matches!(err, ResourceError::Rejected { .. }));
        exec.terminated().await;
    }

    #[tokio::test]
    async fn test_graceful_shutdown_waits_for_pending_task() {
        let exec = EventExecutor::spawn("test-drain").expect("spawn");
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        exec.submit(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .expect("submit");

        exec.shutdown_gracefully(Duration::ZERO, Duration::from_secs(5));
        exec.terminated().await;
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(exec.pending_tasks(), 0);
    }

    #[tokio::test]
    async fn test_timeout_drops_pending_task() {
        let exec = EventExecutor::spawn("test-timeout").expect("spawn");
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let handle = exec
            .submit(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                flag.store(true, Ordering::SeqCst);
            })
            .expect("submit");

        exec.shutdown_gracefully(Duration::ZERO, Duration::from_millis(20));
        exec.terminated().await;
        assert!(!done.load(Ordering::SeqCst));
        assert!(handle.await.expect_err("task dropped").is_cancelled());
    }

    #[tokio::test]
    async fn test_quiet_period_delays_termination() {
        let exec = EventExecutor::spawn("test-quiet").expect("spawn");
        let started = Instant::now();
        exec.shutdown_gracefully(Duration::from_millis(100), Duration::from_secs(5));
        exec.terminated().await;
        assert!(started.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_first_shutdown_parameters_win() {
        let exec = EventExecutor::spawn("test-params").expect("spawn");
        exec.shutdown_gracefully(Duration::ZERO, Duration::ZERO);
        exec.shutdown_gracefully(Duration::from_secs(60), Duration::from_secs(60));
        tokio::time::timeout(Duration::from_secs(5), exec.terminated())
            .await
            .expect("terminated with first parameters");
    }
}
