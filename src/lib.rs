//! # clientres
//!
//! **clientres** holds the expensive, shareable resources of a network client
//! (event loops, a computation pool, a timer, an event bus, latency
//! collection) in one container, so that many connections can reuse them and
//! a single call tears them down.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ Connection 1 │   │ Connection 2 │   │ Connection N │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          ▼                  ▼                  ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ClientResources (cheap Clone, Arc<Inner>)                       │
//! │  - EventLoopGroupProvider ─► EventExecutorGroup per kind (lazy)  │
//! │  - EventExecutorGroup     (computation pool)                     │
//! │  - Timer                  (single worker, one-shot timeouts)     │
//! │  - EventBus               (broadcast, no replay)                 │
//! │  - CommandLatencyCollector + periodic latency publisher          │
//! │  - DnsResolver, TransportCustomizer, DelaySupplier               │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ shutdown() (once, shared result)
//!                                ▼
//!               JoinSet: stop every *owned* component
//!                 └─ deadline = max(quiet, timeout) + slack
//! ```
//!
//! ### Ownership
//! ```text
//! builder setter used ──► Supplied ──► never stopped by the container
//! left unset          ──► Owned    ──► created in build(), stopped by shutdown()
//! ```
//!
//! ## Features
//! | Area             | Description                                              | Key types / traits                                   |
//! |------------------|----------------------------------------------------------|------------------------------------------------------|
//! | **Container**    | Build, share and shut down client resources.             | [`ClientResources`], [`ClientResourcesBuilder`]      |
//! | **Event loops**  | Lazily allocated, reference-counted executor groups.     | [`EventLoopGroupProvider`], [`EventExecutorGroup`]   |
//! | **Timer**        | One-shot timeouts on a dedicated worker.                 | [`Timer`], [`Timeout`]                               |
//! | **Events**       | Fire-and-forget connection and latency events.           | [`EventBus`], [`Event`], [`EventStream`]             |
//! | **Metrics**      | Command latency collection and periodic publishing.      | [`metrics::CommandLatencyCollector`]                 |
//! | **Reconnect**    | Delay strategies, shared or per connection.              | [`delay::Delay`], [`DelaySupplier`]                  |
//! | **Errors**       | Typed errors per phase.                                  | [`ConfigError`], [`ResourceError`], [`ShutdownError`]|
//! | **Configuration**| Centralized settings.                                    | [`Config`]                                           |
//!
//! ## Optional features
//! - `logging`: exports [`EventLogger`], writing every bus event through `tracing` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use clientres::{ClientResources, Event, EventKind};
//! use clientres::metrics::CommandLatencyCollectorOptions;
//! use futures::StreamExt;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resources = ClientResources::builder()
//!         .io_thread_pool_size(4)
//!         .computation_thread_pool_size(4)
//!         .command_latency_collector_options(CommandLatencyCollectorOptions::disabled())
//!         .build()?;
//!
//!     let mut events = resources.event_bus().subscribe();
//!     resources.event_bus().publish(Event::new(EventKind::Connected));
//!     assert_eq!(events.next().await.map(|e| e.kind), Some(EventKind::Connected));
//!
//!     resources.shutdown_with(Duration::ZERO, Duration::ZERO).await?;
//!     Ok(())
//! }
//! ```
mod config;
mod customizer;
mod dns;
mod error;
mod events;
mod executor;
mod provider;
mod resources;
mod timer;

pub mod delay;
pub mod metrics;
pub mod sizing;

// ---- Public re-exports ----

pub use config::Config;
pub use customizer::{NoopCustomizer, TransportCustomizer};
pub use delay::{Delay, DelaySupplier};
pub use dns::{DnsResolver, StaticDnsResolver, SystemDnsResolver, UnresolvedDnsResolver};
pub use error::{ConfigError, ResourceError, ShutdownError};
pub use events::{DefaultEventBus, Event, EventBus, EventKind, EventStream};
pub use executor::{EventExecutor, EventExecutorGroup};
pub use provider::{DefaultEventLoopGroupProvider, EventLoopGroupProvider, EventLoopKind};
pub use resources::{
    ClientResources, ClientResourcesBuilder, Ownership, Resource, ShutdownState,
};
pub use timer::{Timeout, Timer};

// Optional: expose a bus subscriber logging every event (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use events::EventLogger;
