//! Basic usage examples for ConnectionPool

use connpool::{BoxError, Connection, ConnectionPool, PoolConfiguration, PoolError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static DIALS: AtomicUsize = AtomicUsize::new(0);

struct Channel {
    id: usize,
}

impl Connection for Channel {}

async fn dial(_cancel: CancellationToken) -> Result<Channel, BoxError> {
    let id = DIALS.fetch_add(1, Ordering::Relaxed);
    Ok(Channel { id })
}

#[tokio::main]
async fn main() {
    println!("=== connpool - Basic Examples ===\n");

    // Example 1: Checkout and release
    checkout_and_release().await;

    // Example 2: Acquire with timeout
    acquire_with_timeout().await;

    // Example 3: Lifetime recycling
    lifetime_recycling().await;

    // Example 4: Metrics and health
    metrics_and_health().await;
}

async fn checkout_and_release() {
    println!("1. Checkout and Release:");
    let config = PoolConfiguration::new().with_capacity(3).with_initial_size(1);
    let pool = ConnectionPool::new(dial, config).await.unwrap();

    let mut conn = pool.get().await.unwrap();
    println!("   Got channel {} (available: {})", conn.id, pool.available());
    conn.release().unwrap();
    println!("   Available after release: {}", pool.available());

    match conn.release() {
        Err(PoolError::AlreadyClosed) => println!("   Second release rejected"),
        other => println!("   Unexpected: {:?}", other),
    }
    println!();
}

async fn acquire_with_timeout() {
    println!("2. Acquire with Timeout:");
    let pool = ConnectionPool::new(dial, PoolConfiguration::new().with_capacity(1))
        .await
        .unwrap();

    let _held = pool.get().await.unwrap();
    match pool.get_timeout(Duration::from_millis(50)).await {
        Ok(_) => println!("   Got channel"),
        Err(e) => println!("   Error: {}", e),
    }
    println!();
}

async fn lifetime_recycling() {
    println!("3. Lifetime Recycling:");
    let config = PoolConfiguration::new()
        .with_capacity(1)
        .with_max_lifetime(Duration::from_millis(10));
    let pool = ConnectionPool::new(dial, config).await.unwrap();

    for round in 0..3 {
        let mut conn = pool.get().await.unwrap();
        println!("   Round {}: channel {}", round, conn.id);
        tokio::time::sleep(Duration::from_millis(15)).await;
        conn.release().unwrap();
    }
    println!();
}

async fn metrics_and_health() {
    println!("4. Metrics and Health:");
    let pool = ConnectionPool::new(dial, PoolConfiguration::new().with_capacity(2))
        .await
        .unwrap();

    let _conn = pool.get().await.unwrap();
    let health = pool.get_health_status();
    println!("   Healthy: {}", health.is_healthy());
    println!("   Utilization: {:.0}%", health.utilization * 100.0);

    for (key, value) in pool.export_metrics() {
        println!("   {}: {}", key, value);
    }

    if let Ok(text) = pool.export_metrics_prometheus("demo", None) {
        println!("\n{}", text);
    }
}
