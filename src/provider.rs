//! # Event loop group provider.
//!
//! Connections do not create event loops themselves; they ask the provider for
//! the group matching their transport. The provider allocates one
//! [`EventExecutorGroup`] per [`EventLoopKind`] on first use, caches it, and
//! counts references so a group can be released once no connection uses it.
//!
//! ```text
//! allocate(Tcp) ──► cache miss ──► EventExecutorGroup::new(io threads) ──► refs=1
//! allocate(Tcp) ──► cache hit  ─────────────────────────────────────────► refs=2
//! release(g)    ──► refs=1
//! release(g)    ──► refs=0 ──► evict + shutdown_gracefully
//! shutdown()    ──► evict all + shutdown_gracefully + join termination
//! ```
//!
//! ## Rules
//! - Concurrent first access allocates exactly once (per-kind map entry).
//! - After `shutdown()`, `allocate` fails with [`ResourceError::Shutdown`]; a
//!   group created while shutdown was sweeping is stopped again, never leaked.
//! - `shutdown()` with nothing allocated resolves immediately with success.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use tracing::debug;

use crate::config::Config;
use crate::error::{ResourceError, ShutdownError};
use crate::executor::EventExecutorGroup;

/// Transport kind an event loop group serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventLoopKind {
    /// TCP sockets; sized by the I/O pool.
    Tcp,
    /// Unix domain sockets; sized by the I/O pool.
    Unix,
    /// Non-I/O work that wants event-loop affinity; sized by the computation pool.
    Computation,
}

impl EventLoopKind {
    /// Short stable name used in thread names and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLoopKind::Tcp => "tcp",
            EventLoopKind::Unix => "unix",
            EventLoopKind::Computation => "computation",
        }
    }
}

/// # Source of event loop groups.
///
/// Implementations must return the *same* group for repeated allocations of a
/// kind until it is released or the provider is shut down.
#[async_trait]
pub trait EventLoopGroupProvider: Send + Sync + 'static {
    /// Returns the (possibly newly created) group for `kind`.
    fn allocate(&self, kind: EventLoopKind) -> Result<Arc<EventExecutorGroup>, ResourceError>;

    /// Number of I/O threads per allocated I/O group.
    fn io_thread_pool_size(&self) -> usize;

    /// Drops one reference to `group`; shuts it down when it was the last one.
    async fn release(
        &self,
        group: &Arc<EventExecutorGroup>,
        quiet_period: Duration,
        timeout: Duration,
    ) -> Result<(), ShutdownError>;

    /// Shuts down every allocated group and waits for their termination.
    async fn shutdown(&self, quiet_period: Duration, timeout: Duration) -> Result<(), ShutdownError>;
}

struct Allocation {
    group: Arc<EventExecutorGroup>,
    refs: usize,
}

/// Default provider backed by [`EventExecutorGroup`]s.
pub struct DefaultEventLoopGroupProvider {
    io_threads: usize,
    computation_threads: usize,
    name_prefix: Arc<str>,
    groups: DashMap<EventLoopKind, Allocation>,
    shutdown: AtomicBool,
}

impl DefaultEventLoopGroupProvider {
    /// Creates a provider; no thread is started until the first `allocate`.
    pub fn new(io_threads: usize, computation_threads: usize, cfg: &Config) -> Self {
        Self {
            io_threads,
            computation_threads,
            name_prefix: cfg.thread_name_prefix.as_ref().into(),
            groups: DashMap::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Number of groups currently allocated.
    pub fn allocated(&self) -> usize {
        self.groups.len()
    }

    fn threads_for(&self, kind: EventLoopKind) -> usize {
        match kind {
            EventLoopKind::Tcp | EventLoopKind::Unix => self.io_threads,
            EventLoopKind::Computation => self.computation_threads,
        }
    }

    fn create(&self, kind: EventLoopKind) -> Result<EventExecutorGroup, ResourceError> {
        let name = format!("{}-{}", self.name_prefix, kind.as_str());
        let threads = self.threads_for(kind);
        debug!(kind = kind.as_str(), threads, "allocating event loop group");
        EventExecutorGroup::new(name.clone(), threads)
            .map_err(|source| ResourceError::Spawn { name, source })
    }

    fn kind_of(&self, group: &Arc<EventExecutorGroup>) -> Option<EventLoopKind> {
        self.groups
            .iter()
            .find(|entry| Arc::ptr_eq(&entry.group, group))
            .map(|entry| *entry.key())
    }
}

async fn stop(group: Arc<EventExecutorGroup>, quiet_period: Duration, timeout: Duration) {
    group.shutdown_gracefully(quiet_period, timeout);
    group.terminated().await;
}

#[async_trait]
impl EventLoopGroupProvider for DefaultEventLoopGroupProvider {
    fn allocate(&self, kind: EventLoopKind) -> Result<Arc<EventExecutorGroup>, ResourceError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(ResourceError::Shutdown);
        }
        let mut allocation = match self.groups.entry(kind) {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => vacant.insert(Allocation {
                group: Arc::new(self.create(kind)?),
                refs: 0,
            }),
        };
        allocation.refs += 1;
        let group = Arc::clone(&allocation.group);
        drop(allocation);

        // A concurrent shutdown may have swept the map before this insert.
        if self.shutdown.load(Ordering::SeqCst) {
            self.groups.remove_if(&kind, |_, a| Arc::ptr_eq(&a.group, &group));
            group.shutdown_gracefully(Duration::ZERO, Duration::ZERO);
            return Err(ResourceError::Shutdown);
        }
        Ok(group)
    }

    fn io_thread_pool_size(&self) -> usize {
        self.io_threads
    }

    async fn release(
        &self,
        group: &Arc<EventExecutorGroup>,
        quiet_period: Duration,
        timeout: Duration,
    ) -> Result<(), ShutdownError> {
        let Some(kind) = self.kind_of(group) else {
            return Ok(());
        };
        if let Some(mut allocation) = self.groups.get_mut(&kind) {
            allocation.refs = allocation.refs.saturating_sub(1);
        }
        if let Some((_, allocation)) = self.groups.remove_if(&kind, |_, a| a.refs == 0) {
            debug!(kind = kind.as_str(), "releasing last reference to event loop group");
            stop(allocation.group, quiet_period, timeout).await;
        }
        Ok(())
    }

    async fn shutdown(&self, quiet_period: Duration, timeout: Duration) -> Result<(), ShutdownError> {
        self.shutdown.store(true, Ordering::SeqCst);

        let kinds: Vec<EventLoopKind> = self.groups.iter().map(|entry| *entry.key()).collect();
        let groups: Vec<Arc<EventExecutorGroup>> = kinds
            .iter()
            .filter_map(|kind| self.groups.remove(kind))
            .map(|(_, allocation)| allocation.group)
            .collect();

        if groups.is_empty() {
            return Ok(());
        }
        debug!(groups = groups.len(), "shutting down event loop groups");
        join_all(
            groups
                .into_iter()
                .map(|group| stop(group, quiet_period, timeout)),
        )
        .await;
        Ok(())
    }
}

impl std::fmt::Debug for DefaultEventLoopGroupProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultEventLoopGroupProvider")
            .field("io_threads", &self.io_threads)
            .field("computation_threads", &self.computation_threads)
            .field("allocated", &self.groups.len())
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(io: usize) -> DefaultEventLoopGroupProvider {
        DefaultEventLoopGroupProvider::new(io, 3, &Config::default())
    }

    #[tokio::test]
    async fn test_allocate_returns_cached_group() {
        let p = provider(4);
        let a = p.allocate(EventLoopKind::Tcp).expect("allocate");
        let b = p.allocate(EventLoopKind::Tcp).expect("allocate");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.executor_count(), 4);
        assert_eq!(p.allocated(), 1);

        p.shutdown(Duration::ZERO, Duration::ZERO).await.expect("shutdown");
        assert!(a.is_terminated());
    }

    #[tokio::test]
    async fn test_kinds_get_distinct_groups() {
        let p = provider(3);
        let tcp = p.allocate(EventLoopKind::Tcp).expect("tcp");
        let unix = p.allocate(EventLoopKind::Unix).expect("unix");
        assert!(!Arc::ptr_eq(&tcp, &unix));
        p.shutdown(Duration::ZERO, Duration::ZERO).await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_concurrent_first_access_allocates_once() {
        let p = Arc::new(provider(3));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let p = Arc::clone(&p);
            handles.push(std::thread::spawn(move || p.allocate(EventLoopKind::Tcp)));
        }
        let groups: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread").expect("allocate"))
            .collect();
        assert!(groups.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(p.allocated(), 1);
        p.shutdown(Duration::ZERO, Duration::ZERO).await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_release_shuts_down_on_last_reference() {
        let p = provider(3);
        let a = p.allocate(EventLoopKind::Tcp).expect("allocate");
        let b = p.allocate(EventLoopKind::Tcp).expect("allocate");

        p.release(&a, Duration::ZERO, Duration::ZERO).await.expect("release");
        assert!(!a.is_shutting_down());
        assert_eq!(p.allocated(), 1);

        p.release(&b, Duration::ZERO, Duration::ZERO).await.expect("release");
        assert!(b.is_terminated());
        assert_eq!(p.allocated(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_allocations_succeeds() {
        let p = provider(3);
        p.shutdown(Duration::ZERO, Duration::ZERO).await.expect("shutdown");
        p.shutdown(Duration::ZERO, Duration::ZERO).await.expect("second shutdown");
    }

    #[tokio::test]
    async fn test_allocate_after_shutdown_fails() {
        let p = provider(3);
        p.shutdown(Duration::ZERO, Duration::ZERO).await.expect("shutdown");
        let err = p.allocate(EventLoopKind::Tcp).expect_err("must fail");
        assert!(matches!(err, ResourceError::Shutdown));
    }

    #[tokio::test]
    async fn test_allocate_racing_shutdown_leaves_no_live_group() {
        let p = Arc::new(provider(3));
        let mut handles = Vec::new();
        for kind in [EventLoopKind::Tcp, EventLoopKind::Unix, EventLoopKind::Tcp] {
            let p = Arc::clone(&p);
            handles.push(std::thread::spawn(move || {
                let mut granted = Vec::new();
                loop {
                    match p.allocate(kind) {
                        Ok(group) => granted.push(group),
                        Err(ResourceError::Shutdown) => return granted,
                        Err(err) => panic!("unexpected: {err}"),
                    }
                    std::thread::yield_now();
                }
            }));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        p.shutdown(Duration::ZERO, Duration::ZERO).await.expect("shutdown");
        let granted: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread"))
            .collect();

        assert!(!granted.is_empty());
        assert!(granted.iter().all(|g| g.is_shutting_down()));
        assert_eq!(p.allocated(), 0);
    }
}
