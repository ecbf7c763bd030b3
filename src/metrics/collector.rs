//! # Command latency collector.
//!
//! Connections report, for every completed command, the time to the first
//! response byte and the time to completion. The collector aggregates these per
//! [`CommandLatencyId`] until someone retrieves a snapshot.
//!
//! ```text
//! record_command_latency(local, remote, cmd, first, done)
//!        │
//!        ▼
//! samples[id] ──► retrieve_metrics() ──► { id: CommandMetrics{count, first_response, completion} }
//!                       └─ reset_latencies_after_event ─► samples cleared
//! ```
//!
//! ## Rules
//! - A disabled collector records nothing and retrieves an empty snapshot.
//! - `disable()` is a configuration toggle; `shutdown()` additionally drops all samples.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use super::CommandLatencyCollectorOptions;

/// Snapshot of every command's latencies.
pub type LatencyMetrics = HashMap<CommandLatencyId, CommandMetrics>;

/// Key latencies are aggregated under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandLatencyId {
    /// Local address; `None` unless local distinction is enabled.
    pub local: Option<SocketAddr>,
    /// Remote server address.
    pub remote: SocketAddr,
    /// Command name (e.g. `"GET"`).
    pub command: Arc<str>,
}

/// Aggregated latencies of one phase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub min: Duration,
    pub max: Duration,
    /// `(percentile, latency)` pairs in the configured order.
    pub percentiles: Vec<(f64, Duration)>,
}

impl LatencyStats {
    fn from_samples(samples: &VecDeque<Duration>, targets: &[f64]) -> Self {
        let mut sorted: Vec<Duration> = samples.iter().copied().collect();
        sorted.sort_unstable();
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return Self::default();
        };
        let percentiles = targets
            .iter()
            .map(|&p| (p, nearest_rank(&sorted, p)))
            .collect();
        Self {
            min,
            max,
            percentiles,
        }
    }

    /// Latency at percentile `p`, if it was computed.
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        self.percentiles
            .iter()
            .find(|(target, _)| (*target - p).abs() < f64::EPSILON)
            .map(|(_, d)| *d)
    }
}

/// Nearest-rank percentile over a sorted, non-empty slice.
fn nearest_rank(sorted: &[Duration], p: f64) -> Duration {
    let n = sorted.len();
    let rank = ((p / 100.0) * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}

/// Latencies of one command.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandMetrics {
    /// Number of recorded commands.
    pub count: u64,
    /// Time until the first response byte.
    pub first_response: LatencyStats,
    /// Time until the command completed.
    pub completion: LatencyStats,
}

/// # Sink for command latencies.
pub trait CommandLatencyCollector: Send + Sync + 'static {
    /// Records one completed command.
    fn record_command_latency(
        &self,
        local: SocketAddr,
        remote: SocketAddr,
        command: &str,
        first_response: Duration,
        completion: Duration,
    );

    /// Returns the aggregated latencies recorded so far.
    fn retrieve_metrics(&self) -> LatencyMetrics;

    /// True while the collector records.
    fn is_enabled(&self) -> bool;

    /// Stops recording. Idempotent.
    fn disable(&self);

    /// Releases the collector's state. Idempotent.
    fn shutdown(&self);
}

#[derive(Default)]
struct Samples {
    count: u64,
    first_response: VecDeque<Duration>,
    completion: VecDeque<Duration>,
}

impl Samples {
    fn push(&mut self, first_response: Duration, completion: Duration, cap: usize) {
        self.count += 1;
        for (queue, value) in [
            (&mut self.first_response, first_response),
            (&mut self.completion, completion),
        ] {
            if queue.len() >= cap {
                queue.pop_front();
            }
            queue.push_back(value);
        }
    }
}

/// In-memory collector keeping the most recent samples per command.
pub struct DefaultCommandLatencyCollector {
    options: CommandLatencyCollectorOptions,
    enabled: AtomicBool,
    samples: Mutex<HashMap<CommandLatencyId, Samples>>,
}

impl DefaultCommandLatencyCollector {
    pub fn new(options: CommandLatencyCollectorOptions) -> Self {
        Self {
            enabled: AtomicBool::new(options.enabled),
            options,
            samples: Mutex::new(HashMap::new()),
        }
    }

    /// A collector that never records.
    pub fn disabled() -> Self {
        Self::new(CommandLatencyCollectorOptions::disabled())
    }

    pub fn options(&self) -> &CommandLatencyCollectorOptions {
        &self.options
    }
}

impl Default for DefaultCommandLatencyCollector {
    fn default() -> Self {
        Self::new(CommandLatencyCollectorOptions::default())
    }
}

impl CommandLatencyCollector for DefaultCommandLatencyCollector {
    fn record_command_latency(
        &self,
        local: SocketAddr,
        remote: SocketAddr,
        command: &str,
        first_response: Duration,
        completion: Duration,
    ) {
        if !self.is_enabled() {
            return;
        }
        let id = CommandLatencyId {
            local: self.options.local_distinction.then_some(local),
            remote,
            command: command.into(),
        };
        let cap = self.options.max_samples.max(1);
        self.samples
            .lock()
            .entry(id)
            .or_default()
            .push(first_response, completion, cap);
    }

    fn retrieve_metrics(&self) -> LatencyMetrics {
        if !self.is_enabled() {
            return LatencyMetrics::new();
        }
        let taken = {
            let mut samples = self.samples.lock();
            if self.options.reset_latencies_after_event {
                std::mem::take(&mut *samples)
            } else {
                samples
                    .iter()
                    .map(|(id, s)| {
                        let copy = Samples {
                            count: s.count,
                            first_response: s.first_response.clone(),
                            completion: s.completion.clone(),
                        };
                        (id.clone(), copy)
                    })
                    .collect()
            }
        };

        let targets = &self.options.target_percentiles;
        taken
            .into_iter()
            .map(|(id, s)| {
                let metrics = CommandMetrics {
                    count: s.count,
                    first_response: LatencyStats::from_samples(&s.first_response, targets),
                    completion: LatencyStats::from_samples(&s.completion, targets),
                };
                (id, metrics)
            })
            .collect()
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn disable(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            debug!("command latency collection disabled");
        }
    }

    fn shutdown(&self) {
        self.disable();
        self.samples.lock().clear();
    }
}

impl std::fmt::Debug for DefaultCommandLatencyCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultCommandLatencyCollector")
            .field("enabled", &self.is_enabled())
            .field("options", &self.options)
            .finish()
    }
}
