//! Connection and metrics events, and the bus that carries them.
//!
//! - [`Event`]/[`EventKind`]: what gets published.
//! - [`EventBus`]/[`DefaultEventBus`]: how it is delivered.
//! - [`EventStream`]: a subscriber's view of the bus.

mod bus;
mod event;
#[cfg(feature = "logging")]
mod log;

pub use bus::{DefaultEventBus, EventBus, EventStream};
pub use event::{Event, EventKind};
#[cfg(feature = "logging")]
pub use log::EventLogger;
