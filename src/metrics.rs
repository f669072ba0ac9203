//! Metrics collection and export for connection pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Metrics snapshot of a pool
///
/// # Examples
///
/// ```
/// use connpool::{BoxError, Connection, ConnectionPool, PoolConfiguration};
/// use tokio_util::sync::CancellationToken;
///
/// struct Channel;
/// impl Connection for Channel {}
///
/// # tokio_test_rt().block_on(async {
/// let pool = ConnectionPool::new(
///     |_: CancellationToken| async { Ok::<_, BoxError>(Channel) },
///     PoolConfiguration::new().with_capacity(2),
/// )
/// .await
/// .unwrap();
///
/// let mut conn = pool.get().await.unwrap();
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_acquired, 1);
/// assert_eq!(metrics.connections_created, 1);
/// assert_eq!(metrics.outstanding, 1);
/// conn.release().unwrap();
/// # });
/// # fn tokio_test_rt() -> tokio::runtime::Runtime {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
/// # }
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolMetrics {
    /// Successful checkouts
    pub total_acquired: usize,

    /// Checkouts handed back
    pub total_released: usize,

    /// Connections produced by the factory
    pub connections_created: usize,

    /// Connections torn down
    pub connections_closed: usize,

    /// Factory calls that failed
    pub factory_failures: usize,

    /// Connections replaced after sitting idle
    pub idle_evictions: usize,

    /// Connections retired for exceeding their lifetime
    pub lifetime_evictions: usize,

    /// Unhealthy connections parked while still in use
    pub quarantined: usize,

    /// Acquires abandoned because the caller's deadline passed
    pub acquire_timeouts: usize,

    /// Free checkout slots
    pub available: usize,

    /// Checkouts currently held by callers
    pub outstanding: usize,

    /// Pool capacity (0 once closed)
    pub capacity: usize,

    /// Outstanding over capacity (0.0 to 1.0)
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("connections_created".to_string(), self.connections_created.to_string());
        metrics.insert("connections_closed".to_string(), self.connections_closed.to_string());
        metrics.insert("factory_failures".to_string(), self.factory_failures.to_string());
        metrics.insert("idle_evictions".to_string(), self.idle_evictions.to_string());
        metrics.insert("lifetime_evictions".to_string(), self.lifetime_evictions.to_string());
        metrics.insert("quarantined".to_string(), self.quarantined.to_string());
        metrics.insert("acquire_timeouts".to_string(), self.acquire_timeouts.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("outstanding".to_string(), self.outstanding.to_string());
        metrics.insert("capacity".to_string(), self.capacity.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format.
    ///
    /// Every series carries a `pool` label plus the given tags.
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = tags.cloned().unwrap_or_default();
        labels.insert("pool".to_string(), pool_name.to_string());
        let opts = |name: &str, help: &str| Opts::new(name, help).const_labels(labels.clone());

        let registry = Registry::new();

        let counters = [
            ("connpool_acquired_total", "Total successful checkouts", metrics.total_acquired),
            ("connpool_released_total", "Total checkouts released", metrics.total_released),
            ("connpool_connections_created_total", "Connections created by the factory", metrics.connections_created),
            ("connpool_connections_closed_total", "Connections closed", metrics.connections_closed),
            ("connpool_factory_failures_total", "Failed factory calls", metrics.factory_failures),
            ("connpool_idle_evictions_total", "Connections evicted after idling", metrics.idle_evictions),
            ("connpool_lifetime_evictions_total", "Connections retired after max lifetime", metrics.lifetime_evictions),
            ("connpool_quarantined_total", "Unhealthy connections quarantined while in use", metrics.quarantined),
            ("connpool_acquire_timeouts_total", "Acquires that timed out", metrics.acquire_timeouts),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::with_opts(opts(name, help))?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter))?;
        }

        let gauges = [
            ("connpool_slots_available", "Free checkout slots", metrics.available),
            ("connpool_slots_outstanding", "Checkouts currently held", metrics.outstanding),
            ("connpool_capacity", "Configured pool capacity", metrics.capacity),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(opts(name, help))?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge))?;
        }

        let utilization = Gauge::with_opts(opts("connpool_utilization", "Pool utilization ratio"))?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization))?;

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub connections_created: AtomicUsize,
    pub connections_closed: AtomicUsize,
    pub factory_failures: AtomicUsize,
    pub idle_evictions: AtomicUsize,
    pub lifetime_evictions: AtomicUsize,
    pub quarantined: AtomicUsize,
    pub acquire_timeouts: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, available: usize, capacity: usize) -> PoolMetrics {
        let outstanding = capacity.saturating_sub(available);
        let utilization = if capacity > 0 {
            outstanding as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            factory_failures: self.factory_failures.load(Ordering::Relaxed),
            idle_evictions: self.idle_evictions.load(Ordering::Relaxed),
            lifetime_evictions: self.lifetime_evictions.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
            acquire_timeouts: self.acquire_timeouts.load(Ordering::Relaxed),
            available,
            outstanding,
            capacity,
            utilization,
        }
    }
}
