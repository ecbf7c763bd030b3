//! Reconnect delay strategies.
//!
//! This module groups the knobs that control **how long** a connection waits
//! before its next reconnect attempt, and **how** the container hands those
//! strategies out.
//!
//! ## Contents
//! - [`Delay`] the strategy trait (`create_delay(attempt)`)
//! - [`ConstantDelay`], [`ExponentialDelay`] stateless strategies (share freely)
//! - [`DecorrelatedJitterDelay`] stateful strategy (one instance per connection)
//! - [`JitterPolicy`] randomization applied by [`ExponentialDelay`]
//! - [`DelaySupplier`] shared instance vs. per-caller factory
//!
//! ## Quick wiring
//! ```text
//! ClientResourcesBuilder::reconnect_delay(Arc<dyn Delay>)?      → DelaySupplier::Shared
//! ClientResourcesBuilder::reconnect_delay_supplier(supplier)    → as given
//!      └─► ClientResources::reconnect_delay() → DelaySupplier::get()
//! ```
//!
//! ## Defaults
//! - [`exponential`] → first=1ms, factor=2.0, max=30s, no jitter (the container default).
//! - [`decorrelated_jitter`] → factory of `DecorrelatedJitterDelay` (lower=0, upper=30s, base=1ms).

mod decorrelated;
mod exponential;
mod jitter;
mod supplier;

use std::fmt;
use std::time::Duration;

pub use decorrelated::DecorrelatedJitterDelay;
pub use exponential::ExponentialDelay;
pub use jitter::JitterPolicy;
pub use supplier::{DelayFactory, DelaySupplier};

/// # Reconnect delay strategy.
///
/// `attempt` is 1-based: the first reconnect attempt after a disconnect is `1`.
///
/// Stateless strategies derive the delay from `attempt` alone. Stateful ones
/// (see [`Delay::is_stateful`]) remember earlier results and must not be shared
/// between independent callers.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use clientres::delay::Delay;
///
/// #[derive(Debug)]
/// struct Linear;
///
/// impl Delay for Linear {
///     fn create_delay(&self, attempt: u32) -> Duration {
///         Duration::from_millis(100 * u64::from(attempt))
///     }
/// }
///
/// assert_eq!(Linear.create_delay(3), Duration::from_millis(300));
/// ```
pub trait Delay: Send + Sync + fmt::Debug + 'static {
    /// Returns the wait before reconnect attempt `attempt`.
    fn create_delay(&self, attempt: u32) -> Duration;

    /// True if the strategy keeps per-use mutable state.
    fn is_stateful(&self) -> bool {
        false
    }

    /// Clears per-use state. No-op for stateless strategies.
    fn reset(&self) {}

    /// Short type label used in error messages.
    fn type_label(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Stateless fixed delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstantDelay(pub Duration);

impl Delay for ConstantDelay {
    fn create_delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Fixed delay for every attempt.
pub fn constant(delay: Duration) -> ConstantDelay {
    ConstantDelay(delay)
}

/// Exponential delay without jitter (the container default).
pub fn exponential() -> ExponentialDelay {
    ExponentialDelay::default()
}

/// Exponential delay with [`JitterPolicy::Equal`].
pub fn equal_jitter() -> ExponentialDelay {
    ExponentialDelay::default().with_jitter(JitterPolicy::Equal)
}

/// Exponential delay with [`JitterPolicy::Full`].
pub fn full_jitter() -> ExponentialDelay {
    ExponentialDelay::default().with_jitter(JitterPolicy::Full)
}

/// Factory of stateful [`DecorrelatedJitterDelay`]s with default bounds.
pub fn decorrelated_jitter() -> DelaySupplier {
    DelaySupplier::factory(DecorrelatedJitterDelay::default)
}

/// Factory of stateful [`DecorrelatedJitterDelay`]s with explicit bounds.
pub fn decorrelated_jitter_with(lower: Duration, upper: Duration, base: Duration) -> DelaySupplier {
    DelaySupplier::factory(move || DecorrelatedJitterDelay::new(lower, upper, base))
}
