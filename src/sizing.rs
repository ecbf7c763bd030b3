//! # Thread pool sizing policy.
//!
//! Pure functions turning a *requested* pool size (or "unspecified") plus the
//! detected hardware concurrency into an *effective* size.
//!
//! The transport layer needs at least [`MIN_THREADS`] scheduling units: one for
//! I/O, one for computation and one spare. Smaller requests are clamped up.
//!
//! ```text
//! requested ──┐
//!             ├─► requested.unwrap_or(available).max(MIN_THREADS)
//! available ──┘
//! ```
//!
//! # Example
//! ```
//! use clientres::sizing::{effective_pool_size, MIN_THREADS};
//!
//! assert_eq!(effective_pool_size(Some(8), 2), 8);
//! assert_eq!(effective_pool_size(Some(1), 16), MIN_THREADS);
//! assert_eq!(effective_pool_size(None, 12), 12);
//! ```

/// Minimum number of workers per pool.
pub const MIN_THREADS: usize = 3;

/// Effective sizes of the I/O and computation pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSizing {
    /// Number of I/O event-loop workers.
    pub io_thread_pool_size: usize,
    /// Number of computation workers.
    pub computation_thread_pool_size: usize,
}

impl PoolSizing {
    /// Resolves both pools against an explicit hardware concurrency.
    ///
    /// Deterministic; use this in tests instead of [`PoolSizing::detect`].
    pub fn resolve(io: Option<usize>, computation: Option<usize>, available: usize) -> Self {
        Self {
            io_thread_pool_size: effective_pool_size(io, available),
            computation_thread_pool_size: effective_pool_size(computation, available),
        }
    }

    /// Resolves both pools against the detected number of processors.
    pub fn detect(io: Option<usize>, computation: Option<usize>) -> Self {
        Self::resolve(io, computation, available_processors())
    }
}

/// Returns the effective pool size for a request.
///
/// `None` falls back to `available`; the result is never below [`MIN_THREADS`].
#[inline]
pub fn effective_pool_size(requested: Option<usize>, available: usize) -> usize {
    requested.unwrap_or(available).max(MIN_THREADS)
}

/// Number of logical processors visible to this process (at least 1).
pub fn available_processors() -> usize {
    num_cpus::get().max(1)
}
