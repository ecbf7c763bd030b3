use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clientres::delay::{self, DecorrelatedJitterDelay};
use clientres::metrics::{
    CommandLatencyCollector, CommandLatencyCollectorOptions, CommandLatencyPublisherOptions,
    LatencyMetrics,
};
use clientres::sizing::MIN_THREADS;
use clientres::{
    ClientResources, ConfigError, DefaultEventBus, Event, EventBus, EventExecutorGroup, EventKind,
    EventLoopGroupProvider, EventLoopKind, EventStream, ResourceError, ShutdownError,
    ShutdownState, StaticDnsResolver, Timer,
};
use futures::StreamExt;

const NOW: Duration = Duration::ZERO;

// ---- counting test doubles ----

#[derive(Default)]
struct CountingProvider {
    allocations: AtomicUsize,
    releases: AtomicUsize,
    shutdowns: AtomicUsize,
}

#[async_trait]
impl EventLoopGroupProvider for CountingProvider {
    fn allocate(&self, _kind: EventLoopKind) -> Result<Arc<EventExecutorGroup>, ResourceError> {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Err(ResourceError::Shutdown)
    }

    fn io_thread_pool_size(&self) -> usize {
        5
    }

    async fn release(
        &self,
        _group: &Arc<EventExecutorGroup>,
        _quiet_period: Duration,
        _timeout: Duration,
    ) -> Result<(), ShutdownError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self, _quiet_period: Duration, _timeout: Duration) -> Result<(), ShutdownError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct CountingCollector {
    disables: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl CommandLatencyCollector for CountingCollector {
    fn record_command_latency(
        &self,
        _local: std::net::SocketAddr,
        _remote: std::net::SocketAddr,
        _command: &str,
        _first_response: Duration,
        _completion: Duration,
    ) {
    }

    fn retrieve_metrics(&self) -> LatencyMetrics {
        LatencyMetrics::new()
    }

    fn is_enabled(&self) -> bool {
        self.disables.load(Ordering::SeqCst) == 0
    }

    fn disable(&self) {
        self.disables.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct CountingBus {
    inner: DefaultEventBus,
    published: AtomicUsize,
}

impl EventBus for CountingBus {
    fn publish(&self, event: Event) {
        self.published.fetch_add(1, Ordering::SeqCst);
        self.inner.publish(event);
    }

    fn subscribe(&self) -> EventStream {
        self.inner.subscribe()
    }
}

// ---- container ----

#[tokio::test]
async fn test_defaults() {
    let res = ClientResources::create().expect("create");

    assert!(res.io_thread_pool_size() >= MIN_THREADS);
    assert!(res.computation_thread_pool_size() >= MIN_THREADS);
    assert_eq!(
        res.event_executor_group().executor_count(),
        res.computation_thread_pool_size()
    );
    assert_eq!(
        res.event_loop_group_provider().io_thread_pool_size(),
        res.io_thread_pool_size()
    );
    assert!(res.command_latency_collector().is_enabled());
    assert_eq!(res.shutdown_state(), ShutdownState::Running);

    res.shutdown_with(NOW, NOW).await.expect("shutdown");

    assert!(!res.command_latency_collector().is_enabled());
    assert_eq!(res.shutdown_state(), ShutdownState::Terminated);
    assert!(res.event_executor_group().is_terminated());
    assert!(res.timer().is_stopped());
}

#[tokio::test]
async fn test_builder_sizes_and_disabled_collection() {
    let res = ClientResources::builder()
        .io_thread_pool_size(4)
        .computation_thread_pool_size(4)
        .command_latency_collector_options(CommandLatencyCollectorOptions::disabled())
        .build()
        .expect("build");

    assert_eq!(res.io_thread_pool_size(), 4);
    assert_eq!(res.computation_thread_pool_size(), 4);
    assert_eq!(res.event_executor_group().executor_count(), 4);
    assert!(!res.command_latency_collector().is_enabled());

    let tcp = res
        .event_loop_group_provider()
        .allocate(EventLoopKind::Tcp)
        .expect("allocate");
    assert_eq!(tcp.executor_count(), 4);

    res.shutdown_with(NOW, NOW).await.expect("shutdown");
    assert!(tcp.is_terminated());
}

#[tokio::test]
async fn test_small_pool_clamped_to_floor() {
    let res = ClientResources::builder()
        .io_thread_pool_size(1)
        .computation_thread_pool_size(2)
        .build()
        .expect("build");

    assert_eq!(res.io_thread_pool_size(), MIN_THREADS);
    assert_eq!(res.computation_thread_pool_size(), MIN_THREADS);
    assert_eq!(res.event_executor_group().executor_count(), MIN_THREADS);

    res.shutdown_with(NOW, NOW).await.expect("shutdown");
}

#[test]
fn test_zero_pool_size_is_config_error() {
    let err = ClientResources::builder()
        .io_thread_pool_size(0)
        .build()
        .expect_err("zero");
    assert_eq!(err.as_label(), "config_invalid_pool_size");
}

#[tokio::test]
async fn test_supplied_resources_see_no_lifecycle_calls() {
    let group = Arc::new(EventExecutorGroup::new("supplied-computation", 3).expect("group"));
    let timer = Arc::new(Timer::new("supplied-timer").expect("timer"));
    let provider = Arc::new(CountingProvider::default());
    let collector = Arc::new(CountingCollector::default());
    let bus = Arc::new(CountingBus {
        inner: DefaultEventBus::new(8),
        published: AtomicUsize::new(0),
    });

    let res = ClientResources::builder()
        .event_executor_group(group.clone())
        .timer(timer.clone())
        .event_loop_group_provider(provider.clone())
        .command_latency_collector(collector.clone())
        .event_bus(bus.clone())
        .command_latency_publisher_options(CommandLatencyPublisherOptions::disabled())
        .build()
        .expect("build");

    assert_eq!(res.io_thread_pool_size(), 5);
    assert_eq!(res.computation_thread_pool_size(), 3);
    assert!(Arc::ptr_eq(res.event_executor_group(), &group));
    assert!(Arc::ptr_eq(res.timer(), &timer));

    res.shutdown_with(NOW, NOW).await.expect("shutdown");

    assert_eq!(provider.allocations.load(Ordering::SeqCst), 0);
    assert_eq!(provider.releases.load(Ordering::SeqCst), 0);
    assert_eq!(provider.shutdowns.load(Ordering::SeqCst), 0);
    assert_eq!(collector.disables.load(Ordering::SeqCst), 1);
    assert_eq!(collector.shutdowns.load(Ordering::SeqCst), 0);
    assert_eq!(bus.published.load(Ordering::SeqCst), 0);
    assert!(!group.is_shutting_down());
    assert!(!timer.is_stopped());

    // Still usable after the container is gone.
    let value = group.submit(async { 7 }).expect("submit").await.expect("join");
    assert_eq!(value, 7);
    timer.stop().await;
    group.shutdown_gracefully(NOW, NOW);
    group.terminated().await;
}

#[tokio::test]
async fn test_supplied_dns_resolver_is_returned_as_is() {
    let resolver = Arc::new(StaticDnsResolver::new().with_host("cache.local", ["10.1.2.3".parse().expect("ip")]));
    let res = ClientResources::builder()
        .dns_resolver(resolver.clone())
        .build()
        .expect("build");

    let addrs = res.dns_resolver().resolve("cache.local").await.expect("resolve");
    assert_eq!(addrs, vec!["10.1.2.3".parse::<std::net::IpAddr>().expect("ip")]);

    res.shutdown_with(NOW, NOW).await.expect("shutdown");
}

#[tokio::test]
async fn test_double_shutdown_joins_first() {
    let res = ClientResources::builder()
        .io_thread_pool_size(3)
        .computation_thread_pool_size(3)
        .build()
        .expect("build");
    let clone = res.clone();

    let (a, b) = tokio::join!(
        res.shutdown_with(NOW, NOW),
        clone.shutdown_with(Duration::from_secs(60), Duration::from_secs(60)),
    );
    assert_eq!(a, Ok(()));
    assert_eq!(b, Ok(()));

    // Late callers observe the same, already completed, result.
    let late = tokio::time::timeout(Duration::from_secs(1), res.shutdown())
        .await
        .expect("joined immediately");
    assert_eq!(late, Ok(()));
}

#[tokio::test]
async fn test_shutdown_result_survives_dropped_caller() {
    let res = ClientResources::builder()
        .io_thread_pool_size(3)
        .computation_thread_pool_size(3)
        .build()
        .expect("build");

    // Start and abandon the first shutdown; the teardown keeps running.
    drop(tokio::time::timeout(Duration::ZERO, res.shutdown_with(NOW, NOW)).await);
    assert_ne!(res.shutdown_state(), ShutdownState::Running);

    res.shutdown().await.expect("shutdown");
    assert_eq!(res.shutdown_state(), ShutdownState::Terminated);
}

// ---- delays ----

#[test]
fn test_stateful_delay_instance_rejected() {
    let stateful = Arc::new(DecorrelatedJitterDelay::new(
        Duration::ZERO,
        Duration::from_secs(1),
        Duration::from_millis(10),
    ));
    let err = ClientResources::builder()
        .reconnect_delay(stateful)
        .expect_err("stateful instance");
    assert!(matches!(err, ConfigError::StatefulDelayInstance { .. }));
}

#[tokio::test]
async fn test_stateful_delay_distinct_per_call() {
    let res = ClientResources::builder()
        .reconnect_delay_supplier(delay::decorrelated_jitter())
        .build()
        .expect("build");

    let a = res.reconnect_delay();
    let b = res.reconnect_delay();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(a.is_stateful());

    res.shutdown_with(NOW, NOW).await.expect("shutdown");
}

#[tokio::test]
async fn test_stateless_delay_shared() {
    let res = ClientResources::builder()
        .reconnect_delay(Arc::new(delay::constant(Duration::from_millis(250))))
        .expect("stateless")
        .build()
        .expect("build");

    let a = res.reconnect_delay();
    let b = res.reconnect_delay();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.create_delay(9), Duration::from_millis(250));

    let default = ClientResources::create().expect("create");
    assert!(Arc::ptr_eq(&default.reconnect_delay(), &default.reconnect_delay()));

    res.shutdown_with(NOW, NOW).await.expect("shutdown");
    default.shutdown_with(NOW, NOW).await.expect("shutdown");
}

// ---- event bus ----

#[tokio::test]
async fn test_event_bus_delivery() {
    let res = ClientResources::builder()
        .io_thread_pool_size(3)
        .computation_thread_pool_size(3)
        .build()
        .expect("build");
    let bus = res.event_bus();

    let mut early = bus.subscribe();
    let cancelled = bus.subscribe();
    cancelled.cancel();

    let ev = Event::new(EventKind::Disconnected).with_reason("peer closed");
    let seq = ev.seq;
    bus.publish(ev);

    let mut late = bus.subscribe();
    let got = early.next().await.expect("early subscriber gets event");
    assert_eq!(got.seq, seq);
    assert_eq!(got.reason.as_deref(), Some("peer closed"));

    let nothing = tokio::time::timeout(Duration::from_millis(50), late.next()).await;
    assert!(nothing.is_err(), "late subscriber must not see earlier events");

    res.shutdown_with(NOW, NOW).await.expect("shutdown");
}

#[tokio::test]
async fn test_latency_events_published_on_bus() {
    let res = ClientResources::builder()
        .io_thread_pool_size(3)
        .computation_thread_pool_size(3)
        .command_latency_publisher_options(CommandLatencyPublisherOptions {
            emit_interval: Duration::from_millis(20),
        })
        .build()
        .expect("build");

    let mut events = res.event_bus().subscribe();
    let addr: std::net::SocketAddr = "127.0.0.1:6379".parse().expect("addr");
    res.command_latency_collector().record_command_latency(
        addr,
        addr,
        "GET",
        Duration::from_millis(1),
        Duration::from_millis(3),
    );

    let ev = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .expect("latency event in time")
        .expect("event");
    assert_eq!(ev.kind, EventKind::CommandLatency);

    res.shutdown_with(NOW, NOW).await.expect("shutdown");
}
