//! Command latency collection and periodic publishing.
//!
//! - [`CommandLatencyCollector`] the collection contract
//! - [`DefaultCommandLatencyCollector`] in-memory implementation
//! - [`CommandLatencyEventPublisher`] publishes snapshots on the event bus
//! - [`CommandLatencyCollectorOptions`], [`CommandLatencyPublisherOptions`] knobs

mod collector;
mod options;
mod publisher;

pub use collector::{
    CommandLatencyCollector, CommandLatencyId, CommandMetrics, DefaultCommandLatencyCollector,
    LatencyMetrics, LatencyStats,
};
pub use options::{
    CommandLatencyCollectorOptions, CommandLatencyPublisherOptions, DEFAULT_EMIT_INTERVAL,
    DEFAULT_TARGET_PERCENTILES,
};
pub use publisher::CommandLatencyEventPublisher;
