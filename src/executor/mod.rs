//! Worker pools: single executors and executor groups.
//!
//! ## Contents
//! - [`EventExecutor`] one dedicated thread running a current-thread runtime
//! - [`EventExecutorGroup`] `N` executors with round-robin selection
//!
//! Both shut down gracefully with a *quiet period* (no new activity for that
//! long) bounded by a *timeout* (after which pending tasks are dropped).

mod group;
mod worker;

pub use group::EventExecutorGroup;
pub use worker::EventExecutor;
