//! # Container-wide configuration.
//!
//! Provides [`Config`], the centralized settings a [`ClientResources`](crate::ClientResources)
//! is built from: pool sizes, shutdown timing, bus capacity and thread naming.
//!
//! Config is used in two ways:
//! 1. **Builder input**: `ClientResources::builder().config(cfg)`
//! 2. **Shutdown defaults**: `ClientResources::shutdown()` uses the configured quiet period/timeout
//!
//! ## Sentinel values
//! - `io_thread_pool_size = 0` → detect from available processors
//! - `computation_thread_pool_size = 0` → detect from available processors
//!
//! Explicit builder setters take precedence over the sentinels.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use clientres::Config;
//!
//! let mut cfg = Config::default();
//! cfg.io_thread_pool_size = 4;
//! cfg.shutdown_timeout = Duration::from_secs(5);
//!
//! assert_eq!(cfg.io_pool_request(), Some(4));
//! assert_eq!(cfg.computation_pool_request(), None);
//! ```

use std::borrow::Cow;
use std::time::Duration;

/// Global configuration for a resource container.
///
/// ## Field semantics
/// - `io_thread_pool_size`: I/O event-loop workers (`0` = detect)
/// - `computation_thread_pool_size`: computation workers (`0` = detect)
/// - `shutdown_quiet_period`: default quiet period for `shutdown()`
/// - `shutdown_timeout`: default timeout for `shutdown()`
/// - `shutdown_slack`: extra time the coordinator waits for workers to exit
///   after the timeout before abandoning them
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
/// - `thread_name_prefix`: prefix for every worker thread name
#[derive(Clone, Debug)]
pub struct Config {
    /// Requested number of I/O event-loop workers (`0` = number of processors).
    pub io_thread_pool_size: usize,

    /// Requested number of computation workers (`0` = number of processors).
    pub computation_thread_pool_size: usize,

    /// Quiet period applied by the no-argument `shutdown()`.
    ///
    /// A pool terminates once no task was submitted or completed for this long.
    pub shutdown_quiet_period: Duration,

    /// Timeout applied by the no-argument `shutdown()`.
    ///
    /// Pools still busy after this are force-terminated; unfinished tasks are dropped.
    pub shutdown_timeout: Duration,

    /// Grace on top of `max(quiet_period, timeout)` before stuck workers are abandoned.
    pub shutdown_slack: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Prefix for worker thread names (`{prefix}-{pool}-{index}`).
    pub thread_name_prefix: Cow<'static, str>,
}

impl Config {
    /// Returns the requested I/O pool size, `None` when it should be detected.
    #[inline]
    pub fn io_pool_request(&self) -> Option<usize> {
        match self.io_thread_pool_size {
            0 => None,
            n => Some(n),
        }
    }

    /// Returns the requested computation pool size, `None` when it should be detected.
    #[inline]
    pub fn computation_pool_request(&self) -> Option<usize> {
        match self.computation_thread_pool_size {
            0 => None,
            n => Some(n),
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Upper bound the coordinator waits for a shutdown with the given parameters.
    #[inline]
    pub fn shutdown_deadline(&self, quiet_period: Duration, timeout: Duration) -> Duration {
        quiet_period
            .max(timeout)
            .saturating_add(self.shutdown_slack)
    }

    /// Formats a worker thread name for `pool`.
    pub(crate) fn thread_name(&self, pool: &str) -> String {
        format!("{}-{pool}", self.thread_name_prefix)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - pool sizes detected from available processors
    /// - `shutdown_quiet_period = 0s`, `shutdown_timeout = 2s`
    /// - `shutdown_slack = 5s`
    /// - `bus_capacity = 1024`
    /// - `thread_name_prefix = "clientres"`
    fn default() -> Self {
        Self {
            io_thread_pool_size: 0,
            computation_thread_pool_size: 0,
            shutdown_quiet_period: Duration::ZERO,
            shutdown_timeout: Duration::from_secs(2),
            shutdown_slack: Duration::from_secs(5),
            bus_capacity: 1024,
            thread_name_prefix: Cow::Borrowed("clientres"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_map_to_none() {
        let cfg = Config::default();
        assert_eq!(cfg.io_pool_request(), None);
        assert_eq!(cfg.computation_pool_request(), None);
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_shutdown_deadline_adds_slack() {
        let cfg = Config::default();
        assert_eq!(
            cfg.shutdown_deadline(Duration::from_secs(1), Duration::from_secs(3)),
            Duration::from_secs(8)
        );
        assert_eq!(
            cfg.shutdown_deadline(Duration::ZERO, Duration::ZERO),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_thread_name() {
        let cfg = Config::default();
        assert_eq!(cfg.thread_name("timer"), "clientres-timer");
    }
}
