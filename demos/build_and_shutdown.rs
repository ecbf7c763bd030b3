//! # Example: Build and Shutdown
//!
//! Builds a container with every resource owned, uses it the way a client
//! connection would, then shuts it down.
//!
//! Demonstrates how to:
//! - Size the I/O and computation pools through the builder.
//! - Allocate an event loop group for a transport kind.
//! - Schedule a timeout and run work on the computation pool.
//! - Record command latencies and receive the periodic `CommandLatency` event.
//! - Shut everything down once, with a quiet period and a timeout.
//!
//! ## Flow
//! ```text
//! builder().build()
//!   ├─► provider.allocate(Tcp) ──► EventExecutorGroup (io threads)
//!   ├─► timer.new_timeout(50ms) ──► "timeout fired"
//!   ├─► event_executor_group.submit(..) ──► result
//!   ├─► collector.record(..) ──► publisher ──► bus ──► CommandLatency event
//!   └─► shutdown_with(0, 1s) ──► every owned component stopped ──► Terminated
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example build_and_shutdown
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use clientres::metrics::{CommandLatencyCollector, CommandLatencyPublisherOptions};
use clientres::{ClientResources, EventKind, EventLoopKind};
use futures::StreamExt;
use tokio::sync::oneshot;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Build with explicit pool sizes and a fast latency publisher.
    let resources = ClientResources::builder()
        .io_thread_pool_size(4)
        .computation_thread_pool_size(3)
        .command_latency_publisher_options(CommandLatencyPublisherOptions {
            emit_interval: Duration::from_millis(100),
        })
        .build()?;
    println!(
        "[main] built: io={} computation={}",
        resources.io_thread_pool_size(),
        resources.computation_thread_pool_size()
    );

    // 2. Allocate the event loop group a TCP connection would use.
    let tcp = resources
        .event_loop_group_provider()
        .allocate(EventLoopKind::Tcp)?;
    println!("[main] tcp group '{}' with {} loops", tcp.name(), tcp.executor_count());

    // 3. Schedule a one-shot timeout.
    let (fired_tx, fired_rx) = oneshot::channel();
    resources
        .timer()
        .new_timeout(Duration::from_millis(50), move || {
            let _ = fired_tx.send(());
        })?;
    fired_rx.await?;
    println!("[timer] timeout fired");

    // 4. Run work on the computation pool.
    let sum = resources
        .event_executor_group()
        .submit(async { (1..=10u64).sum::<u64>() })?
        .await?;
    println!("[computation] sum = {sum}");

    // 5. Record a latency and wait for the published snapshot.
    let mut events = resources.event_bus().subscribe();
    let local: SocketAddr = "127.0.0.1:50000".parse()?;
    let remote: SocketAddr = "127.0.0.1:6379".parse()?;
    resources.command_latency_collector().record_command_latency(
        local,
        remote,
        "GET",
        Duration::from_micros(300),
        Duration::from_micros(450),
    );
    while let Some(event) = events.next().await {
        if event.kind == EventKind::CommandLatency {
            let commands = event.latencies.map_or(0, |l| l.len());
            println!("[bus] latency snapshot for {commands} command(s)");
            break;
        }
    }

    // 6. Shut down; a second call joins the first.
    resources
        .shutdown_with(Duration::ZERO, Duration::from_secs(1))
        .await?;
    resources.shutdown().await?;
    println!(
        "[main] state={:?} tcp_terminated={}",
        resources.shutdown_state(),
        tcp.is_terminated()
    );
    Ok(())
}
