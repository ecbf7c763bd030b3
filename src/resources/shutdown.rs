//! # Shutdown coordination.
//!
//! The first shutdown request starts the teardown on a dedicated thread with
//! its own runtime and stores a shared handle to its result. Every later
//! request joins that handle, so the teardown runs once and all callers
//! observe the same outcome.
//!
//! ```text
//! shutdown() #1 ──► [Running → ShuttingDown] ──► thread(teardown) ─► Shared result
//! shutdown() #2 ─────────────────────────────────────────────────────────┘ (join)
//!                          teardown finished ──► [Terminated]
//! ```
//!
//! The teardown fans out one future per owned component into a [`JoinSet`] and
//! joins them under a single deadline:
//! - a component error or panic becomes [`ShutdownError::ComponentFailed`] (first one wins);
//! - components still running at the deadline are abandoned and reported as
//!   [`ShutdownError::TimeoutExceeded`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::warn;

use crate::error::ShutdownError;

/// Lifecycle of a resource container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownState {
    /// Accepting work.
    Running,
    /// Shutdown requested; components are stopping.
    ShuttingDown,
    /// Every owned component finished (or was abandoned).
    Terminated,
}

impl ShutdownState {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ShutdownState::Running => "running",
            ShutdownState::ShuttingDown => "shutting_down",
            ShutdownState::Terminated => "terminated",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => ShutdownState::Running,
            1 => ShutdownState::ShuttingDown,
            _ => ShutdownState::Terminated,
        }
    }
}

pub(crate) type ShutdownFuture = BoxFuture<'static, Result<(), ShutdownError>>;

/// One component's stop future, labelled for error reporting.
pub(crate) type ComponentStop = (&'static str, ShutdownFuture);

/// Runs a teardown at most once and shares its result.
pub(crate) struct ShutdownCoordinator {
    thread_name: String,
    state: Arc<AtomicU8>,
    outcome: OnceLock<Shared<ShutdownFuture>>,
}

/// Moves the state to `Terminated` however the teardown ends.
struct TerminateOnDrop(Arc<AtomicU8>);

impl Drop for TerminateOnDrop {
    fn drop(&mut self) {
        self.0.store(ShutdownState::Terminated as u8, Ordering::Release);
    }
}

impl ShutdownCoordinator {
    /// Creates a coordinator whose teardown runs on a thread named `thread_name`.
    pub(crate) fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            state: Arc::new(AtomicU8::new(ShutdownState::Running as u8)),
            outcome: OnceLock::new(),
        }
    }

    pub(crate) fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Starts `teardown` on the first call; every call returns the shared result.
    ///
    /// The teardown runs on its own thread and runtime, never on a pool it
    /// stops, so callers on any executor (or none) observe its result.
    pub(crate) fn trigger<F>(&self, teardown: F) -> Shared<ShutdownFuture>
    where
        F: FnOnce() -> ShutdownFuture,
    {
        self.outcome
            .get_or_init(|| {
                self.state
                    .store(ShutdownState::ShuttingDown as u8, Ordering::Release);
                let fut = teardown();
                let guard = TerminateOnDrop(Arc::clone(&self.state));
                let (tx, rx) = oneshot::channel();

                let spawned = std::thread::Builder::new()
                    .name(self.thread_name.clone())
                    .spawn(move || {
                        let res = match tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()
                        {
                            Ok(runtime) => runtime.block_on(fut),
                            Err(err) => Err(ShutdownError::component("coordinator", err)),
                        };
                        // Terminated before any caller sees the result.
                        drop(guard);
                        let _ = tx.send(res);
                    });

                // A failed spawn drops the closure, and with it the guard.
                if let Err(err) = spawned {
                    return future::ready(Err(ShutdownError::component("coordinator", err)))
                        .boxed()
                        .shared();
                }
                async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(ShutdownError::component(
                            "coordinator",
                            "teardown thread exited without a result",
                        ))
                    })
                }
                .boxed()
                .shared()
            })
            .clone()
    }
}

/// Awaits `fut` until `budget`, counted from `started`, is used up.
///
/// Returns `None` if the budget ran out first.
pub(crate) async fn within<F: Future>(
    started: Instant,
    budget: Duration,
    fut: F,
) -> Option<F::Output> {
    match started.checked_add(budget) {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_owned()
    }
}

/// Runs every component stop concurrently and joins them within `budget` of `started`.
pub(crate) async fn join_components(
    components: Vec<ComponentStop>,
    started: Instant,
    budget: Duration,
) -> Result<(), ShutdownError> {
    let pending: Arc<Mutex<Vec<&'static str>>> =
        Arc::new(Mutex::new(components.iter().map(|(name, _)| *name).collect()));

    let mut set = JoinSet::new();
    for (name, fut) in components {
        let pending = Arc::clone(&pending);
        set.spawn(async move {
            let res = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => Err(ShutdownError::component(name, panic_message(&*payload))),
            };
            pending.lock().retain(|n| *n != name);
            res
        });
    }

    let mut first_failure: Option<ShutdownError> = None;
    let done = async {
        while let Some(joined) = set.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(err) => ShutdownError::component("join", err),
            };
            warn!(error = %failure, "component failed to shut down");
            first_failure.get_or_insert(failure);
        }
    };
    let timed = within(started, budget, done).await;

    if let Some(failure) = first_failure {
        return Err(failure);
    }
    match timed {
        Some(()) => Ok(()),
        None => {
            let stuck = pending.lock().clone();
            warn!(?budget, ?stuck, "shutdown deadline exceeded; abandoning components");
            Err(ShutdownError::TimeoutExceeded {
                timeout: budget,
                stuck,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn stop<F>(name: &'static str, fut: F) -> ComponentStop
    where
        F: std::future::Future<Output = Result<(), ShutdownError>> + Send + 'static,
    {
        (name, fut.boxed())
    }

    fn explode() -> Result<(), ShutdownError> {
        panic!("exploded")
    }

    fn ok() -> Result<(), ShutdownError> {
        Ok(())
    }

    #[tokio::test]
    async fn test_trigger_runs_teardown_once() {
        let coordinator = ShutdownCoordinator::new("test-shutdown");
        let runs = Arc::new(AtomicUsize::new(0));
        assert_eq!(coordinator.state(), ShutdownState::Running);

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            let runs = Arc::clone(&runs);
            outcomes.push(coordinator.trigger(move || {
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), ShutdownError>(())
                }
                .boxed()
            }));
        }
        assert_ne!(coordinator.state(), ShutdownState::Running);
        for outcome in outcomes {
            assert_eq!(outcome.await, Ok(()));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
    }

    #[tokio::test]
    async fn test_join_reports_first_failure() {
        let res = join_components(
            vec![
                stop("ok", async { ok() }),
                stop("bad", async { Err(ShutdownError::component("bad", "boom")) }),
            ],
            Instant::now(),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(res, Err(ShutdownError::component("bad", "boom")));
    }

    #[tokio::test]
    async fn test_join_maps_panic() {
        let res = join_components(
            vec![stop("panicky", async { explode() })],
            Instant::now(),
            Duration::from_secs(5),
        )
        .await;
        match res {
            Err(ShutdownError::ComponentFailed { component, reason }) => {
                assert_eq!(component, "panicky");
                assert!(reason.contains("exploded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_join_times_out_with_stuck_components() {
        let res = join_components(
            vec![
                stop("fast", async { ok() }),
                stop("stuck", futures::future::pending()),
            ],
            Instant::now(),
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(
            res,
            Err(ShutdownError::TimeoutExceeded {
                timeout: Duration::from_millis(50),
                stuck: vec!["stuck"],
            })
        );
    }

    #[tokio::test]
    async fn test_join_empty_succeeds() {
        assert_eq!(
            join_components(Vec::new(), Instant::now(), Duration::ZERO).await,
            Ok(())
        );
    }

    #[tokio::test]
    async fn test_join_counts_budget_from_start() {
        let started = Instant::now()
            .checked_sub(Duration::from_millis(200))
            .expect("process uptime");
        let began = std::time::Instant::now();

        let res = join_components(
            vec![stop("stuck", futures::future::pending())],
            started,
            Duration::from_millis(250),
        )
        .await;

        assert!(matches!(res, Err(ShutdownError::TimeoutExceeded { .. })));
        assert!(began.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_within_spent_budget_gives_up() {
        let started = Instant::now()
            .checked_sub(Duration::from_millis(100))
            .expect("process uptime");
        let spent = within(started, Duration::from_millis(50), futures::future::pending::<()>());
        assert_eq!(spent.await, None);

        let fresh = within(Instant::now(), Duration::from_secs(5), async { 7 });
        assert_eq!(fresh.await, Some(7));
    }

    #[tokio::test]
    async fn test_trigger_terminates_when_teardown_panics() {
        let coordinator = ShutdownCoordinator::new("test-shutdown");
        let res = coordinator.trigger(|| async { explode() }.boxed()).await;

        assert!(matches!(
            res,
            Err(ShutdownError::ComponentFailed { component: "coordinator", .. })
        ));
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
    }

    #[test]
    fn test_trigger_resolves_without_caller_runtime() {
        let coordinator = ShutdownCoordinator::new("test-shutdown");
        let res = futures::executor::block_on(coordinator.trigger(|| {
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ok()
            }
            .boxed()
        }));
        assert_eq!(res, Ok(()));
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
    }
}
