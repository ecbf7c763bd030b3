//! # Event executor group.
//!
//! [`EventExecutorGroup`] owns `N` [`EventExecutor`]s and hands them out
//! round-robin. It serves both as an I/O event-loop group (allocated by the
//! [`EventLoopGroupProvider`](crate::EventLoopGroupProvider)) and as the
//! container's computation pool.
//!
//! ```text
//!            next() ──► executor[i % N]
//!  submit(fut) ──┘
//!
//!  shutdown_gracefully(q, t) ──► every executor ──► terminated() joins all
//! ```

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::debug;

use super::EventExecutor;
use crate::error::ResourceError;

/// A fixed-size group of single-threaded executors.
pub struct EventExecutorGroup {
    name: Arc<str>,
    executors: Vec<EventExecutor>,
    next: AtomicUsize,
}

impl EventExecutorGroup {
    /// Spawns `threads` executors named `{name}-{index}` (at least one).
    pub fn new(name: impl Into<Arc<str>>, threads: usize) -> io::Result<Self> {
        let name = name.into();
        let executors = (0..threads.max(1))
            .map(|i| EventExecutor::spawn(format!("{name}-{i}")))
            .collect::<io::Result<Vec<_>>>()?;

        debug!(group = %name, threads = executors.len(), "event executor group started");
        Ok(Self {
            name,
            executors,
            next: AtomicUsize::new(0),
        })
    }

    /// Group name (thread name prefix).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the next executor in round-robin order.
    pub fn next(&self) -> &EventExecutor {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.executors.len();
        &self.executors[i]
    }

    /// Iterates over every executor of the group.
    pub fn iter(&self) -> std::slice::Iter<'_, EventExecutor> {
        self.executors.iter()
    }

    /// Number of executors (worker threads).
    pub fn executor_count(&self) -> usize {
        self.executors.len()
    }

    /// Submits a future to the next executor.
    pub fn submit<F>(&self, fut: F) -> Result<JoinHandle<F::Output>, ResourceError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.next().submit(fut)
    }

    /// Requests a graceful shutdown of every executor.
    ///
    /// Returns immediately; await [`terminated`](Self::terminated) for completion.
    pub fn shutdown_gracefully(&self, quiet_period: Duration, timeout: Duration) {
        debug!(group = %self.name, ?quiet_period, ?timeout, "event executor group shutting down");
        for executor in &self.executors {
            executor.shutdown_gracefully(quiet_period, timeout);
        }
    }

    /// Completes once every executor has terminated.
    pub async fn terminated(&self) {
        join_all(self.executors.iter().map(|e| e.terminated())).await;
    }

    /// True once a shutdown was requested on every executor.
    pub fn is_shutting_down(&self) -> bool {
        self.executors.iter().all(EventExecutor::is_shutting_down)
    }

    /// True once every executor has terminated.
    pub fn is_terminated(&self) -> bool {
        self.executors.iter().all(EventExecutor::is_terminated)
    }
}

impl<'a> IntoIterator for &'a EventExecutorGroup {
    type Item = &'a EventExecutor;
    type IntoIter = std::slice::Iter<'a, EventExecutor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for EventExecutorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventExecutorGroup")
            .field("name", &self.name)
            .field("executors", &self.executors.len())
            .field("shutting_down", &self.is_shutting_down())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
