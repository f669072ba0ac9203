// connpool demo binary
// Run the demos with: cargo run --example basic

use connpool::{BoxError, Connection, ConnectionPool, PoolConfiguration};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

struct DemoChannel {
    id: usize,
}

impl Connection for DemoChannel {
    fn close(&self) -> Result<(), BoxError> {
        tracing::info!(id = self.id, "channel closed");
        Ok(())
    }
}

async fn dial(cancel: CancellationToken) -> Result<DemoChannel, BoxError> {
    tokio::select! {
        _ = cancel.cancelled() => Err("dial cancelled".into()),
        _ = tokio::time::sleep(Duration::from_millis(20)) => {
            Ok(DemoChannel { id: NEXT_ID.fetch_add(1, Ordering::Relaxed) })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), connpool::PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PoolConfiguration::new()
        .with_capacity(3)
        .with_initial_size(1)
        .with_max_lifetime(Duration::from_secs(60));
    let pool = ConnectionPool::new(dial, config).await?;

    {
        let conn = pool.get().await?;
        tracing::info!(id = conn.id, concurrency = conn.concurrency(), "checked out");
        tracing::info!(available = pool.available(), "while checked out");
    }

    tracing::info!(available = pool.available(), "after release");
    pool.close();
    Ok(())
}
