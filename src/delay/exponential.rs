//! # Exponential reconnect delay.
//!
//! [`ExponentialDelay`] computes `first × factor^(attempt-1)`, clamped to `max`,
//! then applies its [`JitterPolicy`]. The base delay is derived purely from the
//! attempt number, so the strategy carries no state and one instance can be
//! shared by every connection.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use clientres::delay::{Delay, ExponentialDelay, JitterPolicy};
//!
//! let delay = ExponentialDelay {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(delay.create_delay(1), Duration::from_millis(100));
//! assert_eq!(delay.create_delay(2), Duration::from_millis(200));
//! assert_eq!(delay.create_delay(11), Duration::from_secs(10));
//! ```

use std::time::Duration;

use super::{Delay, JitterPolicy};

/// Stateless exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentialDelay {
    /// Delay for the first attempt.
    pub first: Duration,
    /// Upper bound for every attempt.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied after clamping.
    pub jitter: JitterPolicy,
}

impl Default for ExponentialDelay {
    /// `first = 1ms`, `max = 30s`, `factor = 2.0`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl ExponentialDelay {
    /// Returns a copy using the given jitter policy.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    fn base(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let max_secs = self.max.as_secs_f64();
        let unclamped = self.first.as_secs_f64() * self.factor.powi(exp);

        if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped)
        }
    }
}

impl Delay for ExponentialDelay {
    fn create_delay(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.base(attempt))
    }
}
