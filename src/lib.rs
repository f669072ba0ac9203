//! # connpool
//!
//! Bounded, thread-safe pool of reusable client connections for protocols
//! that multiplex many concurrent requests over one connection (gRPC/HTTP2
//! channels and the like).
//!
//! ## Features
//!
//! - Fixed number of checkout slots with async, cancellable acquisition
//! - One physical connection shared by concurrent checkouts, tracked by a
//!   usage counter
//! - Lazy connection creation and optional eager warm-up
//! - Idle-timeout and max-lifetime recycling
//! - Quarantine for unhealthy connections still in use
//! - Automatic release via RAII (Drop trait)
//! - Health status and metrics, with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use connpool::{BoxError, Connection, ConnectionPool, PoolConfiguration};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Channel;
//! impl Connection for Channel {}
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let pool = ConnectionPool::new(
//!     |_cancel: CancellationToken| async { Ok::<_, BoxError>(Channel) },
//!     PoolConfiguration::new().with_capacity(4),
//! )
//! .await?;
//!
//! {
//!     let conn = pool.get().await?;
//!     // use `*conn`; the checkout is released when `conn` goes out of scope
//! }
//! assert_eq!(pool.available(), 4);
//! # Ok::<(), connpool::PoolError>(())
//! # }).unwrap();
//! ```

mod pool;
mod handle;
mod factory;
mod counter;
mod config;
mod metrics;
mod health;
mod eviction;
mod errors;

pub use pool::ConnectionPool;
pub use handle::PooledConnection;
pub use factory::{Connection, ConnectionFactory};
pub use counter::UsageCounter;
pub use config::PoolConfiguration;
pub use metrics::PoolMetrics;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use health::HealthStatus;
pub use eviction::EvictionPolicy;
pub use errors::{BoxError, PoolError, PoolResult};
