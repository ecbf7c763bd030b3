//! Resource container, its builder and shutdown coordination.

mod builder;
mod client;
mod resource;
mod shutdown;

pub use builder::ClientResourcesBuilder;
pub use client::ClientResources;
pub use resource::{Ownership, Resource};
pub use shutdown::ShutdownState;
