//! Options for command latency collection and publishing.

use std::time::Duration;

/// Percentiles computed by default.
pub const DEFAULT_TARGET_PERCENTILES: [f64; 5] = [50.0, 90.0, 95.0, 99.0, 99.9];

/// Default interval between two latency events.
pub const DEFAULT_EMIT_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// How a [`DefaultCommandLatencyCollector`](super::DefaultCommandLatencyCollector) records latencies.
///
/// ## Field semantics
/// - `enabled`: record at all (a disabled collector ignores every sample)
/// - `local_distinction`: keep latencies apart per local address
/// - `reset_latencies_after_event`: clear samples after every retrieval
/// - `target_percentiles`: percentiles reported per command (0..=100)
/// - `max_samples`: samples kept per command and phase; older ones are evicted
#[derive(Clone, Debug)]
pub struct CommandLatencyCollectorOptions {
    pub enabled: bool,
    pub local_distinction: bool,
    pub reset_latencies_after_event: bool,
    pub target_percentiles: Vec<f64>,
    pub max_samples: usize,
}

impl CommandLatencyCollectorOptions {
    /// Options for a collector that records nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Keeps latencies apart per local address.
    pub fn with_local_distinction(mut self, on: bool) -> Self {
        self.local_distinction = on;
        self
    }

    /// Clears samples after every retrieval.
    pub fn with_reset_after_event(mut self, on: bool) -> Self {
        self.reset_latencies_after_event = on;
        self
    }

    /// Replaces the reported percentiles. Values are clamped to `0..=100`.
    pub fn with_target_percentiles(mut self, percentiles: impl IntoIterator<Item = f64>) -> Self {
        self.target_percentiles = percentiles.into_iter().map(|p| p.clamp(0.0, 100.0)).collect();
        self
    }
}

impl Default for CommandLatencyCollectorOptions {
    /// Enabled, no local distinction, reset after every event, p50/p90/p95/p99/p99.9.
    fn default() -> Self {
        Self {
            enabled: true,
            local_distinction: false,
            reset_latencies_after_event: true,
            target_percentiles: DEFAULT_TARGET_PERCENTILES.to_vec(),
            max_samples: 4096,
        }
    }
}

/// How often latency snapshots are published on the event bus.
///
/// `emit_interval = 0` disables publishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandLatencyPublisherOptions {
    pub emit_interval: Duration,
}

impl CommandLatencyPublisherOptions {
    /// Options that never publish.
    pub fn disabled() -> Self {
        Self {
            emit_interval: Duration::ZERO,
        }
    }

    /// True if snapshots are published at all.
    pub fn is_enabled(&self) -> bool {
        !self.emit_interval.is_zero()
    }
}

impl Default for CommandLatencyPublisherOptions {
    fn default() -> Self {
        Self {
            emit_interval: DEFAULT_EMIT_INTERVAL,
        }
    }
}
