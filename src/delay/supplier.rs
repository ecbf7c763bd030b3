//! # Delay supplier: shared instance vs. per-caller factory.
//!
//! The container hands a reconnect delay to every connection that asks for one.
//! How it does so depends on whether the strategy keeps state:
//!
//! ```text
//! DelaySupplier::Shared(Arc<dyn Delay>)   get() ──► same Arc every time
//! DelaySupplier::Factory(DelayFactory)    get() ──► factory() → fresh instance
//! ```
//!
//! The variant is chosen once, at configuration time. A stateful instance cannot
//! be turned into a factory after the fact, so [`DelaySupplier::shared`] rejects it.

use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;

use super::{Delay, ExponentialDelay};

/// Constructor producing a fresh delay instance per call.
pub type DelayFactory = Arc<dyn Fn() -> Arc<dyn Delay> + Send + Sync>;

/// Source of reconnect delays for connections.
#[derive(Clone)]
pub enum DelaySupplier {
    /// One stateless instance shared by every caller.
    Shared(Arc<dyn Delay>),
    /// A factory invoked on every request.
    Factory(DelayFactory),
}

impl DelaySupplier {
    /// Wraps a stateless delay instance.
    ///
    /// # Errors
    /// [`ConfigError::StatefulDelayInstance`] if `delay.is_stateful()`.
    pub fn shared(delay: Arc<dyn Delay>) -> Result<Self, ConfigError> {
        if delay.is_stateful() {
            return Err(ConfigError::StatefulDelayInstance {
                delay: delay.type_label(),
            });
        }
        Ok(DelaySupplier::Shared(delay))
    }

    /// Wraps a factory; every [`get`](Self::get) mints a new instance.
    pub fn factory<F, D>(factory: F) -> Self
    where
        F: Fn() -> D + Send + Sync + 'static,
        D: Delay,
    {
        DelaySupplier::Factory(Arc::new(move || Arc::new(factory()) as Arc<dyn Delay>))
    }

    /// Returns a delay for one caller.
    ///
    /// Not idempotent for [`DelaySupplier::Factory`]: each call yields a distinct instance.
    pub fn get(&self) -> Arc<dyn Delay> {
        match self {
            DelaySupplier::Shared(delay) => Arc::clone(delay),
            DelaySupplier::Factory(factory) => factory(),
        }
    }

    /// True if this supplier mints per-caller instances.
    pub fn is_factory(&self) -> bool {
        matches!(self, DelaySupplier::Factory(_))
    }
}

impl Default for DelaySupplier {
    /// Shared [`ExponentialDelay::default`].
    fn default() -> Self {
        DelaySupplier::Shared(Arc::new(ExponentialDelay::default()))
    }
}

impl fmt::Debug for DelaySupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelaySupplier::Shared(delay) => f.debug_tuple("Shared").field(delay).finish(),
            DelaySupplier::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
