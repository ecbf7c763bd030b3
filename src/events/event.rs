//! # Domain events published on the event bus.
//!
//! The [`EventKind`] enum classifies events across two categories:
//! - **Connection events**: connection lifecycle and reconnect attempts
//! - **Metrics events**: periodic command latency snapshots
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! endpoints, attempts, delays and latency metrics.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use clientres::{Event, EventKind};
//!
//! let remote = "127.0.0.1:6379".parse().unwrap();
//! let ev = Event::new(EventKind::ReconnectFailed)
//!     .with_remote(remote)
//!     .with_reason("connection refused")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(400));
//!
//! assert_eq!(ev.kind, EventKind::ReconnectFailed);
//! assert_eq!(ev.remote, Some(remote));
//! assert_eq!(ev.attempt, Some(3));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::metrics::LatencyMetrics;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of domain events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Connection events ===
    /// Transport connected (before protocol handshake).
    ///
    /// Sets: `local`, `remote`
    Connected,

    /// Connection completed its handshake and is ready for commands.
    ///
    /// Sets: `local`, `remote`
    ConnectionActivated,

    /// Transport disconnected.
    ///
    /// Sets: `local`, `remote`, optional `reason`
    Disconnected,

    /// Connection stopped accepting commands.
    ///
    /// Sets: `local`, `remote`
    ConnectionDeactivated,

    /// A reconnect attempt is scheduled.
    ///
    /// Sets: `remote`, `attempt`, `delay_ms`
    ReconnectAttempt,

    /// A reconnect attempt failed.
    ///
    /// Sets: `remote`, `attempt`, `reason`
    ReconnectFailed,

    // === Metrics events ===
    /// Periodic snapshot of command latencies.
    ///
    /// Sets: `latencies`
    CommandLatency,
}

impl EventKind {
    /// Short stable label (kebab-case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::ConnectionActivated => "connection-activated",
            EventKind::Disconnected => "disconnected",
            EventKind::ConnectionDeactivated => "connection-deactivated",
            EventKind::ReconnectAttempt => "reconnect-attempt",
            EventKind::ReconnectFailed => "reconnect-failed",
            EventKind::CommandLatency => "command-latency",
        }
    }
}

/// Domain event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Local endpoint of the connection.
    pub local: Option<SocketAddr>,
    /// Remote endpoint of the connection.
    pub remote: Option<SocketAddr>,
    /// Reconnect attempt (starting from 1).
    pub attempt: Option<u32>,
    /// Reconnect delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, disconnect cause).
    pub reason: Option<Arc<str>>,
    /// Latency snapshot (only for `CommandLatency`).
    pub latencies: Option<Arc<LatencyMetrics>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            local: None,
            remote: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            latencies: None,
        }
    }

    /// Creates a `CommandLatency` event carrying `metrics`.
    pub fn command_latency(metrics: LatencyMetrics) -> Self {
        let mut ev = Event::new(EventKind::CommandLatency);
        ev.latencies = Some(Arc::new(metrics));
        ev
    }

    /// Attaches the local endpoint.
    #[inline]
    pub fn with_local(mut self, addr: SocketAddr) -> Self {
        self.local = Some(addr);
        self
    }

    /// Attaches the remote endpoint.
    #[inline]
    pub fn with_remote(mut self, addr: SocketAddr) -> Self {
        self.remote = Some(addr);
        self
    }

    /// Attaches a reconnect attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a reconnect delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for connection lifecycle events.
    #[inline]
    pub fn is_connection_event(&self) -> bool {
        !matches!(self.kind, EventKind::CommandLatency)
    }
}
