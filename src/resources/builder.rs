//! # Builder for [`ClientResources`].
//!
//! Every resource is an override point. Whatever is left unset is created by
//! [`build`](ClientResourcesBuilder::build) and owned by the container;
//! whatever is set is supplied and survives the container's shutdown.
//!
//! ```text
//! builder() ─► setters ─► build()
//!                           ├─ validate (no pool allocated yet)
//!                           ├─ size pools (supplied groups dictate their size)
//!                           ├─ create unset resources  ─► Owned
//!                           ├─ wrap set resources      ─► Supplied
//!                           └─ start latency publisher (if enabled)
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use super::ClientResources;
use super::client::Inner;
use super::resource::Resource;
use super::shutdown::ShutdownCoordinator;
use crate::config::Config;
use crate::customizer::{NoopCustomizer, TransportCustomizer};
use crate::delay::{Delay, DelaySupplier};
use crate::dns::{DnsResolver, SystemDnsResolver};
use crate::error::ConfigError;
use crate::events::{DefaultEventBus, EventBus};
use crate::executor::EventExecutorGroup;
use crate::metrics::{
    CommandLatencyCollector, CommandLatencyCollectorOptions, CommandLatencyEventPublisher,
    CommandLatencyPublisherOptions, DefaultCommandLatencyCollector,
};
use crate::provider::{DefaultEventLoopGroupProvider, EventLoopGroupProvider};
use crate::sizing::PoolSizing;
use crate::timer::Timer;

/// Configures and builds a [`ClientResources`].
///
/// # Example
/// ```
/// use clientres::ClientResources;
/// use clientres::metrics::CommandLatencyCollectorOptions;
///
/// let resources = ClientResources::builder()
///     .io_thread_pool_size(4)
///     .computation_thread_pool_size(4)
///     .command_latency_collector_options(CommandLatencyCollectorOptions::disabled())
///     .build()
///     .unwrap();
///
/// assert_eq!(resources.io_thread_pool_size(), 4);
/// assert!(!resources.command_latency_collector().is_enabled());
/// ```
#[derive(Default)]
pub struct ClientResourcesBuilder {
    config: Config,
    io_thread_pool_size: Option<usize>,
    computation_thread_pool_size: Option<usize>,
    event_executor_group: Option<Arc<EventExecutorGroup>>,
    event_loop_group_provider: Option<Arc<dyn EventLoopGroupProvider>>,
    timer: Option<Arc<Timer>>,
    event_bus: Option<Arc<dyn EventBus>>,
    command_latency_collector: Option<Arc<dyn CommandLatencyCollector>>,
    collector_options: CommandLatencyCollectorOptions,
    publisher_options: CommandLatencyPublisherOptions,
    dns_resolver: Option<Arc<dyn DnsResolver>>,
    transport_customizer: Option<Arc<dyn TransportCustomizer>>,
    reconnect_delay: Option<DelaySupplier>,
}

impl ClientResourcesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base configuration. Explicit pool size setters take precedence over it.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Number of I/O threads per event loop group (at least 3 are used).
    ///
    /// Ignored when an event loop group provider is supplied.
    pub fn io_thread_pool_size(mut self, n: usize) -> Self {
        self.io_thread_pool_size = Some(n);
        self
    }

    /// Number of computation threads (at least 3 are used).
    ///
    /// Ignored when an event executor group is supplied.
    pub fn computation_thread_pool_size(mut self, n: usize) -> Self {
        self.computation_thread_pool_size = Some(n);
        self
    }

    /// Supplies the computation pool.
    pub fn event_executor_group(mut self, group: Arc<EventExecutorGroup>) -> Self {
        self.event_executor_group = Some(group);
        self
    }

    /// Supplies the event loop group provider.
    pub fn event_loop_group_provider(mut self, provider: Arc<dyn EventLoopGroupProvider>) -> Self {
        self.event_loop_group_provider = Some(provider);
        self
    }

    /// Supplies the timer.
    pub fn timer(mut self, timer: Arc<Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Supplies the event bus.
    pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Supplies the command latency collector.
    ///
    /// Its `shutdown()` is never called by the container; `disable()` is.
    pub fn command_latency_collector(mut self, collector: Arc<dyn CommandLatencyCollector>) -> Self {
        self.command_latency_collector = Some(collector);
        self
    }

    /// Options for the default collector. Ignored when a collector is supplied.
    pub fn command_latency_collector_options(mut self, options: CommandLatencyCollectorOptions) -> Self {
        self.collector_options = options;
        self
    }

    /// How often latency snapshots are published on the event bus.
    pub fn command_latency_publisher_options(mut self, options: CommandLatencyPublisherOptions) -> Self {
        self.publisher_options = options;
        self
    }

    pub fn dns_resolver(mut self, resolver: Arc<dyn DnsResolver>) -> Self {
        self.dns_resolver = Some(resolver);
        self
    }

    pub fn transport_customizer(mut self, customizer: Arc<dyn TransportCustomizer>) -> Self {
        self.transport_customizer = Some(customizer);
        self
    }

    /// Sets a stateless reconnect delay shared by every connection.
    ///
    /// # Errors
    /// [`ConfigError::StatefulDelayInstance`] if `delay` is stateful; use
    /// [`reconnect_delay_factory`](Self::reconnect_delay_factory) instead.
    pub fn reconnect_delay(mut self, delay: Arc<dyn Delay>) -> Result<Self, ConfigError> {
        self.reconnect_delay = Some(DelaySupplier::shared(delay)?);
        Ok(self)
    }

    /// Sets a factory minting one reconnect delay per connection.
    pub fn reconnect_delay_factory<F, D>(mut self, factory: F) -> Self
    where
        F: Fn() -> D + Send + Sync + 'static,
        D: Delay,
    {
        self.reconnect_delay = Some(DelaySupplier::factory(factory));
        self
    }

    pub fn reconnect_delay_supplier(mut self, supplier: DelaySupplier) -> Self {
        self.reconnect_delay = Some(supplier);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.io_thread_pool_size == Some(0) {
            return Err(ConfigError::InvalidPoolSize { pool: "io" });
        }
        if self.computation_thread_pool_size == Some(0) {
            return Err(ConfigError::InvalidPoolSize { pool: "computation" });
        }
        Ok(())
    }

    /// Validates the configuration, then creates every unset resource.
    ///
    /// Does not require a tokio runtime: every pool runs on its own threads.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidPoolSize`] for an explicit pool size of zero
    /// - [`ConfigError::Spawn`] if a worker thread cannot be started
    pub fn build(self) -> Result<ClientResources, ConfigError> {
        self.validate()?;
        let cfg = self.config;

        // Supplied pools report their own size.
        let mut sizing = PoolSizing::detect(
            self.io_thread_pool_size.or(cfg.io_pool_request()),
            self.computation_thread_pool_size
                .or(cfg.computation_pool_request()),
        );
        if let Some(provider) = &self.event_loop_group_provider {
            sizing.io_thread_pool_size = provider.io_thread_pool_size();
        }
        if let Some(group) = &self.event_executor_group {
            sizing.computation_thread_pool_size = group.executor_count();
        }
        let PoolSizing {
            io_thread_pool_size,
            computation_thread_pool_size,
        } = sizing;

        let event_executor_group = match self.event_executor_group {
            Some(group) => Resource::supplied(group),
            None => {
                let name = cfg.thread_name("computation");
                let group = EventExecutorGroup::new(name.clone(), computation_thread_pool_size)
                    .map_err(|source| ConfigError::Spawn { name, source })?;
                Resource::owned(Arc::new(group))
            }
        };
        let event_loop_group_provider: Resource<dyn EventLoopGroupProvider> =
            Resource::from_option(self.event_loop_group_provider, || {
                Arc::new(DefaultEventLoopGroupProvider::new(
                    io_thread_pool_size,
                    computation_thread_pool_size,
                    &cfg,
                ))
            });
        let timer = match self.timer {
            Some(timer) => Resource::supplied(timer),
            None => {
                let name = cfg.thread_name("timer");
                let timer =
                    Timer::new(name.clone()).map_err(|source| ConfigError::Spawn { name, source })?;
                Resource::owned(Arc::new(timer))
            }
        };
        let event_bus: Resource<dyn EventBus> = Resource::from_option(self.event_bus, || {
            Arc::new(DefaultEventBus::new(cfg.bus_capacity_clamped()))
        });
        let collector_options = self.collector_options;
        let command_latency_collector: Resource<dyn CommandLatencyCollector> =
            Resource::from_option(self.command_latency_collector, || {
                Arc::new(DefaultCommandLatencyCollector::new(collector_options.clone()))
            });

        let latency_publisher = match CommandLatencyEventPublisher::start(
            event_executor_group.get().next(),
            Arc::clone(event_bus.get()),
            Arc::clone(command_latency_collector.get()),
            &self.publisher_options,
        ) {
            Ok(publisher) => publisher,
            Err(err) => {
                warn!(error = %err, "command latency publisher not started");
                None
            }
        };

        debug!(
            io_threads = io_thread_pool_size,
            computation_threads = computation_thread_pool_size,
            executor_group = event_executor_group.ownership().as_label(),
            provider = event_loop_group_provider.ownership().as_label(),
            timer = timer.ownership().as_label(),
            event_bus = event_bus.ownership().as_label(),
            collector = command_latency_collector.ownership().as_label(),
            "client resources built"
        );

        let shutdown_thread = cfg.thread_name("shutdown");
        Ok(ClientResources {
            inner: Arc::new(Inner {
                config: cfg,
                io_thread_pool_size,
                computation_thread_pool_size,
                event_executor_group,
                event_loop_group_provider,
                timer,
                event_bus,
                command_latency_collector,
                collector_options,
                publisher_options: self.publisher_options,
                latency_publisher,
                dns_resolver: self
                    .dns_resolver
                    .unwrap_or_else(|| Arc::new(SystemDnsResolver)),
                transport_customizer: self
                    .transport_customizer
                    .unwrap_or_else(|| Arc::new(NoopCustomizer)),
                reconnect_delay: self.reconnect_delay.unwrap_or_default(),
                shutdown: ShutdownCoordinator::new(shutdown_thread),
            }),
        })
    }
}

impl std::fmt::Debug for ClientResourcesBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientResourcesBuilder")
            .field("config", &self.config)
            .field("io_thread_pool_size", &self.io_thread_pool_size)
            .field("computation_thread_pool_size", &self.computation_thread_pool_size)
            .field("event_executor_group", &self.event_executor_group.is_some())
            .field("event_loop_group_provider", &self.event_loop_group_provider.is_some())
            .field("timer", &self.timer.is_some())
            .field("event_bus", &self.event_bus.is_some())
            .field("command_latency_collector", &self.command_latency_collector.is_some())
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::DecorrelatedJitterDelay;
    use std::time::Duration;

    #[test]
    fn test_zero_pool_size_rejected_before_allocation() {
        let err = ClientResourcesBuilder::new()
            .io_thread_pool_size(0)
            .build()
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::InvalidPoolSize { pool: "io" }));

        let err = ClientResourcesBuilder::new()
            .computation_thread_pool_size(0)
            .build()
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::InvalidPoolSize { pool: "computation" }));
    }

    #[test]
    fn test_stateful_delay_instance_rejected() {
        let delay = Arc::new(DecorrelatedJitterDelay::new(
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_millis(1),
        ));
        let err = ClientResourcesBuilder::new()
            .reconnect_delay(delay)
            .expect_err("stateful instance");
        assert!(matches!(err, ConfigError::StatefulDelayInstance { .. }));
    }

    #[test]
    fn test_config_sentinels_and_explicit_override() {
        let mut cfg = Config::default();
        cfg.io_thread_pool_size = 5;
        cfg.computation_thread_pool_size = 6;
        cfg.thread_name_prefix = "cfgtest".into();

        let res = ClientResourcesBuilder::new()
            .config(cfg)
            .computation_thread_pool_size(4)
            .build()
            .expect("build");
        assert_eq!(res.io_thread_pool_size(), 5);
        assert_eq!(res.computation_thread_pool_size(), 4);
        assert_eq!(res.event_executor_group().executor_count(), 4);
        assert!(res.event_executor_group().name().starts_with("cfgtest-"));
    }
}
