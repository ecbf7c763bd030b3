//! # Jitter applied to reconnect delays.
//!
//! [`JitterPolicy`] adds randomness to a computed delay so that many connections
//! losing the same server do not reconnect in lockstep.
//!
//! - [`JitterPolicy::None`]  exact delay
//! - [`JitterPolicy::Full`]  random in `[0, delay]`
//! - [`JitterPolicy::Equal`] `delay/2 + random[0, delay/2]`
//!
//! All three are stateless. The stateful decorrelated variant lives in
//! [`DecorrelatedJitterDelay`](super::DecorrelatedJitterDelay), built on [`decorrelated`].

use rand::Rng;
use std::time::Duration;

/// Randomization strategy for stateless delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact delay.
    #[default]
    None,

    /// Full jitter: random delay in `[0, delay]`.
    Full,

    /// Equal jitter: `delay/2 + random[0, delay/2]`.
    ///
    /// Preserves ~75% of the original delay on average.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
        }
    }
}

/// Full jitter: random[0, delay]
fn full_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=ms))
}

/// Equal jitter: delay/2 + random[0, delay/2]
fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_millis(half + jitter)
}

/// Decorrelated jitter: `random[base, min(prev * 3, max)]`.
///
/// `prev` is the previously returned delay; the caller owns that state.
pub(crate) fn decorrelated(base: Duration, prev: Duration, max: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    let prev_ms = prev.as_millis() as u64;
    let max_ms = max.as_millis() as u64;

    let upper_bound = prev_ms.saturating_mul(3).min(max_ms);
    let clamped_upper = upper_bound.max(base_ms);

    if base_ms >= clamped_upper {
        return base;
    }
    Duration::from_millis(rand::rng().random_range(base_ms..=clamped_upper))
}
