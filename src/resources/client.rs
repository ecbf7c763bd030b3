//! # The shared resource container.
//!
//! [`ClientResources`] is a cheap, cloneable handle to the resources every
//! client connection of an application shares: event loops, a computation
//! pool, a timer, the event bus, latency collection, DNS and transport hooks,
//! and the reconnect delay strategy.
//!
//! ## Shutdown
//! ```text
//! shutdown_with(q, t)
//!   ├─ stop latency publisher
//!   ├─ collector.disable()                       (owned or supplied)
//!   └─ JoinSet, deadline = max(q, t) + slack:    (owned only)
//!        ├─ collector.shutdown()
//!        ├─ provider.shutdown(q, t)
//!        ├─ timer.stop()
//!        └─ executor_group.shutdown_gracefully(q, t) + terminated()
//! ```
//!
//! ## Rules
//! - Supplied resources get no lifecycle call, except the collector's `disable()`.
//! - Only the first shutdown call starts the teardown; later calls (with any
//!   parameters) join it and observe the same result.
//! - The teardown runs on its own thread and runtime; dropping the returned
//!   future does not cancel it, and it may be awaited from any executor,
//!   including the container's own pools.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{info, warn};

use super::builder::ClientResourcesBuilder;
use super::resource::Resource;
use super::shutdown::{ComponentStop, ShutdownCoordinator, ShutdownState, join_components, within};
use crate::config::Config;
use crate::customizer::TransportCustomizer;
use crate::delay::{Delay, DelaySupplier};
use crate::dns::DnsResolver;
use crate::error::{ConfigError, ShutdownError};
use crate::events::EventBus;
use crate::executor::EventExecutorGroup;
use crate::metrics::{
    CommandLatencyCollector, CommandLatencyCollectorOptions, CommandLatencyEventPublisher,
    CommandLatencyPublisherOptions,
};
use crate::provider::EventLoopGroupProvider;
use crate::timer::Timer;

pub(super) struct Inner {
    pub(super) config: Config,
    pub(super) io_thread_pool_size: usize,
    pub(super) computation_thread_pool_size: usize,
    pub(super) event_executor_group: Resource<EventExecutorGroup>,
    pub(super) event_loop_group_provider: Resource<dyn EventLoopGroupProvider>,
    pub(super) timer: Resource<Timer>,
    pub(super) event_bus: Resource<dyn EventBus>,
    pub(super) command_latency_collector: Resource<dyn CommandLatencyCollector>,
    pub(super) collector_options: CommandLatencyCollectorOptions,
    pub(super) publisher_options: CommandLatencyPublisherOptions,
    pub(super) latency_publisher: Option<CommandLatencyEventPublisher>,
    pub(super) dns_resolver: Arc<dyn DnsResolver>,
    pub(super) transport_customizer: Arc<dyn TransportCustomizer>,
    pub(super) reconnect_delay: DelaySupplier,
    pub(super) shutdown: ShutdownCoordinator,
}

/// Shared, lifecycle-managed resources for client connections.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use clientres::ClientResources;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let resources = ClientResources::create().unwrap();
/// assert!(resources.io_thread_pool_size() >= 3);
///
/// let delay = resources.reconnect_delay();
/// assert!(delay.create_delay(1) <= Duration::from_secs(30));
///
/// resources.shutdown_with(Duration::ZERO, Duration::ZERO).await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct ClientResources {
    pub(super) inner: Arc<Inner>,
}

impl ClientResources {
    /// Creates a container with every resource defaulted and owned.
    ///
    /// # Errors
    /// [`ConfigError::Spawn`] if a worker thread cannot be started.
    pub fn create() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ClientResourcesBuilder {
        ClientResourcesBuilder::new()
    }

    /// Returns a builder pre-populated with this container's resources, all supplied.
    ///
    /// A container built from it shares the running resources and never shuts them down.
    pub fn mutate(&self) -> ClientResourcesBuilder {
        let inner = &self.inner;
        ClientResourcesBuilder::new()
            .config(inner.config.clone())
            .event_executor_group(Arc::clone(inner.event_executor_group.get()))
            .event_loop_group_provider(Arc::clone(inner.event_loop_group_provider.get()))
            .timer(Arc::clone(inner.timer.get()))
            .event_bus(Arc::clone(inner.event_bus.get()))
            .command_latency_collector(Arc::clone(inner.command_latency_collector.get()))
            .command_latency_collector_options(inner.collector_options.clone())
            .command_latency_publisher_options(inner.publisher_options)
            .dns_resolver(Arc::clone(&inner.dns_resolver))
            .transport_customizer(Arc::clone(&inner.transport_customizer))
            .reconnect_delay_supplier(inner.reconnect_delay.clone())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The computation pool.
    pub fn event_executor_group(&self) -> &Arc<EventExecutorGroup> {
        self.inner.event_executor_group.get()
    }

    pub fn event_loop_group_provider(&self) -> &Arc<dyn EventLoopGroupProvider> {
        self.inner.event_loop_group_provider.get()
    }

    pub fn timer(&self) -> &Arc<Timer> {
        self.inner.timer.get()
    }

    pub fn event_bus(&self) -> &Arc<dyn EventBus> {
        self.inner.event_bus.get()
    }

    pub fn command_latency_collector(&self) -> &Arc<dyn CommandLatencyCollector> {
        self.inner.command_latency_collector.get()
    }

    pub fn dns_resolver(&self) -> &Arc<dyn DnsResolver> {
        &self.inner.dns_resolver
    }

    pub fn transport_customizer(&self) -> &Arc<dyn TransportCustomizer> {
        &self.inner.transport_customizer
    }

    /// Returns a reconnect delay for one connection.
    ///
    /// Stateful strategies yield a fresh instance per call; stateless ones the same `Arc`.
    pub fn reconnect_delay(&self) -> Arc<dyn Delay> {
        self.inner.reconnect_delay.get()
    }

    /// Effective number of I/O threads per event loop group.
    pub fn io_thread_pool_size(&self) -> usize {
        self.inner.io_thread_pool_size
    }

    /// Effective number of computation threads.
    pub fn computation_thread_pool_size(&self) -> usize {
        self.inner.computation_thread_pool_size
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.inner.shutdown.state()
    }

    /// Shuts down with the configured quiet period and timeout.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let cfg = &self.inner.config;
        self.shutdown_with(cfg.shutdown_quiet_period, cfg.shutdown_timeout)
            .await
    }

    /// Shuts down every owned resource.
    ///
    /// `(0, 0)` stops immediately. Resolves once every owned component has
    /// terminated, or with the first failure; it always resolves.
    pub async fn shutdown_with(
        &self,
        quiet_period: Duration,
        timeout: Duration,
    ) -> Result<(), ShutdownError> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .shutdown
            .trigger(move || teardown(inner, quiet_period, timeout).boxed())
            .await
    }
}

async fn teardown(
    inner: Arc<Inner>,
    quiet_period: Duration,
    timeout: Duration,
) -> Result<(), ShutdownError> {
    let started = Instant::now();
    let budget = inner.config.shutdown_deadline(quiet_period, timeout);
    info!(?quiet_period, ?timeout, "shutting down client resources");

    if let Some(publisher) = &inner.latency_publisher {
        if within(started, budget, publisher.shutdown()).await.is_none() {
            warn!("command latency publisher did not stop in time");
        }
    }
    inner.command_latency_collector.get().disable();

    let mut components: Vec<ComponentStop> = Vec::new();

    if inner.command_latency_collector.is_owned() {
        let collector = Arc::clone(inner.command_latency_collector.get());
        components.push((
            "command_latency_collector",
            async move {
                collector.shutdown();
                Ok(())
            }
            .boxed(),
        ));
    }
    if inner.event_loop_group_provider.is_owned() {
        let provider = Arc::clone(inner.event_loop_group_provider.get());
        components.push((
            "event_loop_group_provider",
            async move { provider.shutdown(quiet_period, timeout).await }.boxed(),
        ));
    }
    if inner.timer.is_owned() {
        let timer = Arc::clone(inner.timer.get());
        components.push((
            "timer",
            async move {
                let unprocessed = timer.stop().await;
                if unprocessed > 0 {
                    warn!(unprocessed, "timer stopped with pending timeouts");
                }
                Ok(())
            }
            .boxed(),
        ));
    }
    if inner.event_executor_group.is_owned() {
        let group = Arc::clone(inner.event_executor_group.get());
        components.push((
            "event_executor_group",
            async move {
                group.shutdown_gracefully(quiet_period, timeout);
                group.terminated().await;
                Ok(())
            }
            .boxed(),
        ));
    }

    let res = join_components(components, started, budget).await;
    match &res {
        Ok(()) => info!("client resources shut down"),
        Err(err) => warn!(error = %err, label = err.as_label(), "client resources shut down with errors"),
    }
    res
}

impl std::fmt::Debug for ClientResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = &self.inner;
        f.debug_struct("ClientResources")
            .field("io_thread_pool_size", &inner.io_thread_pool_size)
            .field("computation_thread_pool_size", &inner.computation_thread_pool_size)
            .field("event_executor_group", &inner.event_executor_group)
            .field("event_loop_group_provider", &inner.event_loop_group_provider)
            .field("timer", &inner.timer)
            .field("event_bus", &inner.event_bus)
            .field("command_latency_collector", &inner.command_latency_collector)
            .field("reconnect_delay", &inner.reconnect_delay)
            .field("state", &self.shutdown_state())
            .finish()
    }
}
