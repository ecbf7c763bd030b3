use futures::StreamExt;
use tracing::{debug, info, warn};

use super::{Event, EventKind, EventStream};

/// Logs every event of a subscription through `tracing`.
///
/// Enabled via the `logging` feature. Useful for demos and debugging.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventLogger;

impl EventLogger {
    /// Logs a single event.
    pub fn log(&self, e: &Event) {
        match e.kind {
            EventKind::Connected | EventKind::ConnectionActivated => {
                info!(kind = e.kind.as_label(), local = ?e.local, remote = ?e.remote);
            }
            EventKind::Disconnected | EventKind::ConnectionDeactivated => {
                info!(kind = e.kind.as_label(), local = ?e.local, remote = ?e.remote, reason = ?e.reason);
            }
            EventKind::ReconnectAttempt => {
                debug!(kind = e.kind.as_label(), remote = ?e.remote, attempt = ?e.attempt, delay_ms = ?e.delay_ms);
            }
            EventKind::ReconnectFailed => {
                warn!(kind = e.kind.as_label(), remote = ?e.remote, attempt = ?e.attempt, reason = ?e.reason);
            }
            EventKind::CommandLatency => {
                let commands = e.latencies.as_ref().map_or(0, |m| m.len());
                debug!(kind = e.kind.as_label(), commands);
            }
        }
    }

    /// Logs events from `stream` until it ends.
    pub async fn run(self, mut stream: EventStream) {
        while let Some(event) = stream.next().await {
            self.log(&event);
        }
    }
}
