//! Many concurrent tasks sharing a small set of connections

use connpool::{BoxError, Connection, ConnectionPool, PoolConfiguration};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static DIALS: AtomicUsize = AtomicUsize::new(0);

struct Channel {
    id: usize,
}

impl Connection for Channel {
    fn close(&self) -> Result<(), BoxError> {
        println!("   channel {} closed", self.id);
        Ok(())
    }
}

async fn dial(cancel: CancellationToken) -> Result<Channel, BoxError> {
    tokio::select! {
        _ = cancel.cancelled() => Err("dial cancelled".into()),
        _ = tokio::time::sleep(Duration::from_millis(5)) => {
            Ok(Channel { id: DIALS.fetch_add(1, Ordering::Relaxed) })
        }
    }
}

#[tokio::main]
async fn main() {
    println!("=== connpool - Multiplexed Access ===\n");

    let config = PoolConfiguration::new()
        .with_capacity(4)
        .with_initial_size(2)
        .with_idle_timeout(Duration::from_secs(30))
        .with_acquire_timeout(Duration::from_secs(1));
    let pool = ConnectionPool::new(dial, config).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let mut conn = pool.get().await.unwrap();
            let (id, sharing) = (conn.id, conn.concurrency());
            tokio::time::sleep(Duration::from_millis(10)).await;
            conn.release().unwrap();
            println!("   task {:>2} used channel {} ({} concurrent)", i, id, sharing);
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    let metrics = pool.get_metrics();
    println!("\n   checkouts: {}", metrics.total_acquired);
    println!("   channels dialed: {}", metrics.connections_created);

    pool.close();
}
