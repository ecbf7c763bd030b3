//! # Example: Supplied Resources
//!
//! Two containers share one set of running resources. The second one is
//! derived with `mutate()`, so it only borrows them: its shutdown leaves
//! everything running for the first.
//!
//! Demonstrates how to:
//! - Supply your own DNS resolver and reconnect delay strategy.
//! - Derive a container that shares, but does not own, the resources.
//! - Get a per-connection reconnect delay from a factory.
//!
//! ## Flow
//! ```text
//! primary  = builder().dns_resolver(static).reconnect_delay_factory(..).build()
//! borrowed = primary.mutate().build()        (every resource Supplied)
//!
//! borrowed.shutdown() ──► nothing stopped; primary keeps working
//! primary.shutdown()  ──► owned resources stopped
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example supplied_resources
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use clientres::delay::{DecorrelatedJitterDelay, Delay};
use clientres::{ClientResources, DnsResolver, StaticDnsResolver};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Build the primary container with a static resolver and a stateful delay.
    let resolver = StaticDnsResolver::new()
        .with_host("cache.internal", [IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))]);
    let primary = ClientResources::builder()
        .dns_resolver(Arc::new(resolver))
        .reconnect_delay_factory(|| {
            DecorrelatedJitterDelay::new(
                Duration::from_millis(10),
                Duration::from_secs(5),
                Duration::from_millis(50),
            )
        })
        .build()?;

    let addrs = primary.dns_resolver().resolve("cache.internal").await?;
    println!("[dns] cache.internal -> {addrs:?}");

    // 2. Every connection gets its own delay instance.
    let first = primary.reconnect_delay();
    let second = primary.reconnect_delay();
    println!(
        "[delay] distinct instances: {}, attempt 1 waits {:?}",
        !Arc::ptr_eq(&first, &second),
        first.create_delay(1)
    );

    // 3. Derive a container that borrows everything.
    let borrowed = primary.mutate().build()?;
    println!(
        "[main] shared timer: {}",
        Arc::ptr_eq(primary.timer(), borrowed.timer())
    );

    // 4. Shutting down the borrower leaves the primary running.
    borrowed.shutdown_with(Duration::ZERO, Duration::ZERO).await?;
    let answer = primary.event_executor_group().submit(async { 42 })?.await?;
    println!(
        "[main] borrower state={:?}, primary still computes: {answer}",
        borrowed.shutdown_state()
    );

    // 5. The owner stops the resources.
    primary.shutdown_with(Duration::ZERO, Duration::ZERO).await?;
    println!("[main] primary state={:?}", primary.shutdown_state());
    Ok(())
}
