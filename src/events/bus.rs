//! # Event bus for broadcasting domain events.
//!
//! [`EventBus`] is the publish/subscribe seam connections use to report
//! lifecycle changes. [`DefaultEventBus`] is a thin wrapper around
//! [`tokio::sync::broadcast`]; callers may supply their own implementation.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Subscribers (many):
//!   Connection 1 ──┐                 ┌──► EventStream A
//!   Connection 2 ──┼──► EventBus ────┼──► EventStream B
//!   Latency pub. ──┘  (broadcast)    └──► EventStream C
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and never fails.
//! - **No replay**: a stream only observes events published after `subscribe()` returned.
//! - **Lag handling**: a slow stream silently skips the events it fell behind on.
//! - **Cancellation**: dropping (or [`EventStream::cancel`]-ing) a stream stops delivery
//!   to it only; publishers and other streams are unaffected.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::event::Event;

/// # Publish/subscribe channel for domain events.
pub trait EventBus: Send + Sync + 'static {
    /// Broadcasts `event` to every current subscriber.
    fn publish(&self, event: Event);

    /// Returns a stream of events published from now on.
    fn subscribe(&self) -> EventStream;
}

/// Subscription to an [`EventBus`].
///
/// Implements [`Stream`]; ends when the bus is dropped.
pub struct EventStream {
    inner: Pin<Box<dyn Stream<Item = Event> + Send>>,
}

impl EventStream {
    /// Wraps any event stream (for custom [`EventBus`] implementations).
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Event> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Wraps a broadcast receiver, skipping lag notifications.
    pub fn from_receiver(rx: broadcast::Receiver<Event>) -> Self {
        Self::from_stream(BroadcastStream::new(rx).filter_map(|item| future::ready(item.ok())))
    }

    /// Stops delivery to this subscriber.
    pub fn cancel(self) {}
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventStream { .. }")
    }
}

/// Broadcast-backed event bus.
///
/// ### Properties
/// - **Bounded capacity**: one ring buffer shared by every subscriber.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct DefaultEventBus {
    tx: broadcast::Sender<Event>,
}

impl DefaultEventBus {
    /// Creates a bus with the given capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for DefaultEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus for DefaultEventBus {
    fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    fn subscribe(&self) -> EventStream {
        EventStream::from_receiver(self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::time::Duration;

    #[tokio::test]
    async fn test_subscriber_receives_event_once() {
        let bus = DefaultEventBus::new(16);
        let mut stream = bus.subscribe();
        let ev = Event::new(EventKind::Connected);
        let seq = ev.seq;
        bus.publish(ev);

        let got = stream.next().await.expect("event");
        assert_eq!(got.seq, seq);
        let again = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(again.is_err(), "event delivered twice");
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_nothing() {
        let bus = DefaultEventBus::new(16);
        bus.publish(Event::new(EventKind::Connected));
        let mut late = bus.subscribe();
        let got = tokio::time::timeout(Duration::from_millis(50), late.next()).await;
        assert!(got.is_err());
    }

    #[tokio::test]
    async fn test_cancel_affects_only_that_subscriber() {
        let bus = DefaultEventBus::new(16);
        let first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        first.cancel();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(Event::new(EventKind::Disconnected));
        let got = second.next().await.expect("event");
        assert_eq!(got.kind, EventKind::Disconnected);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_old_events() {
        let bus = DefaultEventBus::new(2);
        let mut stream = bus.subscribe();
        for attempt in 1..=5 {
            bus.publish(Event::new(EventKind::ReconnectAttempt).with_attempt(attempt));
        }
        let got = stream.next().await.expect("event");
        assert_eq!(got.attempt, Some(4));
    }

    #[tokio::test]
    async fn test_stream_ends_when_bus_dropped() {
        let bus = DefaultEventBus::new(4);
        let mut stream = bus.subscribe();
        drop(bus);
        assert!(stream.next().await.is_none());
    }
}
