//! # Decorrelated jitter delay (stateful).
//!
//! Each delay is drawn from `[base, min(prev * 3, upper)]`, where `prev` is the
//! delay this instance returned last time. Because `prev` is per-instance state,
//! two reconnecting connections must never share an instance; obtain one per
//! connection through [`decorrelated_jitter`](super::decorrelated_jitter).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{Delay, jitter};

/// Stateful decorrelated-jitter backoff.
#[derive(Debug)]
pub struct DecorrelatedJitterDelay {
    lower: Duration,
    upper: Duration,
    base: Duration,
    prev_ms: AtomicU64,
}

impl DecorrelatedJitterDelay {
    /// Creates a delay bounded by `[lower, upper]` growing from `base`.
    pub fn new(lower: Duration, upper: Duration, base: Duration) -> Self {
        Self {
            lower,
            upper,
            base,
            prev_ms: AtomicU64::new(0),
        }
    }

    /// Delay returned by the previous call (zero after a reset).
    pub fn previous(&self) -> Duration {
        Duration::from_millis(self.prev_ms.load(Ordering::Relaxed))
    }
}

impl Default for DecorrelatedJitterDelay {
    /// `lower = 0`, `upper = 30s`, `base = 1ms`.
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::from_secs(30), Duration::from_millis(1))
    }
}

impl Delay for DecorrelatedJitterDelay {
    fn create_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.reset();
        }
        let base = self.base.min(self.upper);
        let prev = self.previous().max(base);
        let next = jitter::decorrelated(base, prev, self.upper)
            .clamp(self.lower.min(self.upper), self.upper);

        self.prev_ms
            .store(next.as_millis().min(u128::from(u64::MAX)) as u64, Ordering::Relaxed);
        next
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn reset(&self) {
        self.prev_ms.store(0, Ordering::Relaxed);
    }
}
