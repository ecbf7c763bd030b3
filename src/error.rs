//! Error types used by the resource container and its components.
//!
//! This module defines three error enums, split by *when* they surface:
//!
//! - [`ConfigError`]: programmer errors caught while configuring/building a
//!   [`ClientResources`](crate::ClientResources), before any pool is allocated.
//! - [`ResourceError`]: errors raised while *using* a live resource
//!   (submitting to a stopped executor, allocating from a stopped provider).
//! - [`ShutdownError`]: failures reported through the result of a coordinated shutdown.
//!
//! All types provide `as_label` (stable snake_case label for logs/metrics).

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Configuration-time errors.
///
/// Returned from builder setters and [`ClientResourcesBuilder::build`](crate::ClientResourcesBuilder::build).
/// None of these can happen after the container is built.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A stateful delay was handed over as an instance.
    ///
    /// Stateful delays keep per-connection backoff state, so the container needs a
    /// factory to mint one instance per caller.
    #[error("stateful delay `{delay}` must be configured through a factory, not as an instance")]
    StatefulDelayInstance {
        /// Type name of the rejected delay.
        delay: &'static str,
    },

    /// A thread pool size of zero was requested.
    #[error("{pool} thread pool size must be greater than zero")]
    InvalidPoolSize {
        /// Which pool (`"io"` or `"computation"`).
        pool: &'static str,
    },

    /// A worker thread or its runtime could not be created.
    #[error("failed to spawn worker `{name}`: {source}")]
    Spawn {
        /// Name of the worker that failed to start.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use clientres::ConfigError;
    ///
    /// let err = ConfigError::InvalidPoolSize { pool: "io" };
    /// assert_eq!(err.as_label(), "config_invalid_pool_size");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::StatefulDelayInstance { .. } => "config_stateful_delay_instance",
            ConfigError::InvalidPoolSize { .. } => "config_invalid_pool_size",
            ConfigError::Spawn { .. } => "config_spawn_failed",
        }
    }
}

/// # Errors produced while using a live resource.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The executor is shutting down and no longer accepts work.
    #[error("executor `{executor}` is shutting down; task rejected")]
    Rejected {
        /// Name of the executor that rejected the task.
        executor: Arc<str>,
    },

    /// The event loop group provider was shut down; no further allocations.
    #[error("event loop group provider is shut down")]
    Shutdown,

    /// A worker thread or its runtime could not be created.
    #[error("failed to spawn worker `{name}`: {source}")]
    Spawn {
        /// Name of the worker that failed to start.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl ResourceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResourceError::Rejected { .. } => "resource_rejected",
            ResourceError::Shutdown => "resource_shutdown",
            ResourceError::Spawn { .. } => "resource_spawn_failed",
        }
    }
}

/// # Errors reported by a coordinated shutdown.
///
/// Cloneable: every caller joining the same shutdown observes the same value.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// A component failed (or panicked) while shutting down.
    #[error("component `{component}` failed to shut down: {reason}")]
    ComponentFailed {
        /// Component name (e.g. `"event_executor_group"`).
        component: &'static str,
        /// Human-readable failure reason.
        reason: Arc<str>,
    },

    /// Some components did not terminate before the deadline and were abandoned.
    #[error("shutdown timeout {timeout:?} exceeded; stuck: {stuck:?}")]
    TimeoutExceeded {
        /// The deadline that elapsed.
        timeout: Duration,
        /// Components that had not terminated.
        stuck: Vec<&'static str>,
    },
}

impl ShutdownError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use clientres::ShutdownError;
    /// use std::time::Duration;
    ///
    /// let err = ShutdownError::TimeoutExceeded { timeout: Duration::from_secs(2), stuck: vec![] };
    /// assert_eq!(err.as_label(), "shutdown_timeout_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ShutdownError::ComponentFailed { .. } => "shutdown_component_failed",
            ShutdownError::TimeoutExceeded { .. } => "shutdown_timeout_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ShutdownError::ComponentFailed { component, reason } => {
                format!("component={component} reason={reason}")
            }
            ShutdownError::TimeoutExceeded { timeout, stuck } => {
                format!("timeout exceeded after {timeout:?}; stuck components={stuck:?}")
            }
        }
    }

    /// Builds a [`ShutdownError::ComponentFailed`] from any displayable reason.
    pub(crate) fn component(component: &'static str, reason: impl ToString) -> Self {
        ShutdownError::ComponentFailed {
            component,
            reason: reason.to_string().into(),
        }
    }
}
