//! Core connection pool implementation

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::eviction::EvictionPolicy;
use crate::factory::{Connection, ConnectionFactory};
use crate::handle::{ConnectionCell, PooledConnection};
use crate::health::HealthStatus;
use crate::metrics::{MetricsTracker, PoolMetrics};

use crossbeam::queue::{ArrayQueue, SegQueue};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// A queue slot: a live connection or an empty placeholder
type Slot<C> = Option<Arc<ConnectionCell<C>>>;

/// The pool's queues; replaced by `None` when the pool closes
pub(crate) struct Queues<C> {
    /// Exactly `capacity` slots, minus those taken by in-flight acquires
    slots: ArrayQueue<Slot<C>>,
    /// Unhealthy connections still referenced by checkouts
    quarantine: SegQueue<Arc<ConnectionCell<C>>>,
    /// One permit per free checkout slot
    permits: Semaphore,
}

impl<C> Queues<C> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: ArrayQueue::new(capacity),
            quarantine: SegQueue::new(),
            permits: Semaphore::new(capacity),
        }
    }
}

impl<C: Connection> Queues<C> {
    /// Drop quarantined connections that have already been closed
    fn prune_quarantine(&self) {
        for _ in 0..self.quarantine.len() {
            let Some(cell) = self.quarantine.pop() else {
                break;
            };
            if !cell.is_closed() {
                self.quarantine.push(cell);
            }
        }
    }
}

/// Puts an empty placeholder back if an acquire fails or is dropped after
/// taking a slot.
struct PlaceholderGuard<'a, C> {
    queues: &'a Queues<C>,
    armed: bool,
}

impl<C> Drop for PlaceholderGuard<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.queues.slots.push(None);
        }
    }
}

pub(crate) struct PoolShared<C: Connection> {
    queues: RwLock<Option<Arc<Queues<C>>>>,
    factory: Arc<dyn ConnectionFactory<Connection = C>>,
    policy: EvictionPolicy,
    capacity: usize,
    acquire_timeout: Option<Duration>,
    metrics: MetricsTracker,
}

impl<C: Connection> PoolShared<C> {
    fn queues(&self) -> Option<Arc<Queues<C>>> {
        self.queues.read().clone()
    }

    fn close_cell(&self, cell: &ConnectionCell<C>) -> bool {
        let closed = cell.close();
        if closed {
            MetricsTracker::incr(&self.metrics.connections_closed);
        }
        closed
    }

    async fn connect(&self, cancel: &CancellationToken) -> PoolResult<Arc<ConnectionCell<C>>> {
        match self.factory.connect(cancel.clone()).await {
            Ok(conn) => {
                MetricsTracker::incr(&self.metrics.connections_created);
                tracing::debug!("pooled connection created");
                Ok(Arc::new(ConnectionCell::new(conn)))
            }
            Err(err) => {
                MetricsTracker::incr(&self.metrics.factory_failures);
                tracing::warn!(error = %err, "connection factory failed");
                Err(PoolError::factory(err))
            }
        }
    }

    /// Claim the slot's connection for one more checkout, or `None` when a
    /// fresh connection is needed.
    fn reuse(&self, cell: Arc<ConnectionCell<C>>, now: Instant) -> Option<Arc<ConnectionCell<C>>> {
        // Retired cells belong to whoever retired them; just drop the slot's reference.
        if cell.is_retired() {
            return None;
        }

        // The slot holder is the only party able to add users, so a zero
        // count cannot change under us here.
        if cell.usage.get() == 0 && cell.meta.is_idle_expired(&self.policy, now) {
            cell.mark_unhealthy();
            self.close_cell(&cell);
            MetricsTracker::incr(&self.metrics.idle_evictions);
            tracing::debug!("idle connection evicted");
            return None;
        }

        cell.usage.increment();
        if cell.is_retired() {
            // lost a race with a release retiring the connection
            cell.usage.decrement();
            return None;
        }
        Some(cell)
    }

    pub(crate) fn check_in(&self, cell: &Arc<ConnectionCell<C>>, unhealthy: &mut bool) -> PoolResult<()> {
        let queues = self.queues().ok_or(PoolError::Closed)?;
        if queues.permits.available_permits() >= self.capacity {
            return Err(PoolError::PoolFull);
        }

        let expired = cell.meta.is_lifetime_expired(&self.policy, Instant::now());
        if expired {
            *unhealthy = true;
        }

        if *unhealthy {
            // flag before decrementing so a concurrent acquire that bumps the
            // count afterwards always sees the retirement
            if cell.mark_unhealthy() && expired {
                MetricsTracker::incr(&self.metrics.lifetime_evictions);
            }
            let remaining = cell.usage.decrement();
            if remaining <= 0 {
                self.close_cell(cell);
                queues.prune_quarantine();
                tracing::debug!(expired, "unhealthy connection closed");
            } else {
                queues.prune_quarantine();
                queues.quarantine.push(Arc::clone(cell));
                MetricsTracker::incr(&self.metrics.quarantined);
                tracing::debug!(concurrency = remaining, "unhealthy connection quarantined");
                if queues.permits.is_closed() {
                    self.close_cell(cell);
                }
            }
        } else {
            // stamp first so a zero count never pairs with a stale release time
            cell.meta.touch();
            cell.usage.decrement();
        }

        MetricsTracker::incr(&self.metrics.total_released);
        queues.permits.add_permits(1);
        Ok(())
    }

    fn drain(&self, queues: &Queues<C>) -> usize {
        let mut closed = 0;
        while let Some(slot) = queues.slots.pop() {
            if let Some(cell) = slot
                && self.close_cell(&cell)
            {
                closed += 1;
            }
        }
        while let Some(cell) = queues.quarantine.pop() {
            if self.close_cell(&cell) {
                closed += 1;
            }
        }
        closed
    }
}

/// Bounded pool of client connections.
///
/// Each checkout takes one of `capacity` slots. A checked-out connection stays
/// available to later checkouts, so one physical connection can serve many
/// concurrent callers; new connections are only created for empty, idle or
/// retired slots.
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
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let config = PoolConfiguration::new().with_capacity(3).with_initial_size(1);
/// let pool = ConnectionPool::new(
///     |_: CancellationToken| async { Ok::<_, BoxError>(Channel) },
///     config,
/// )
/// .await
/// .unwrap();
///
/// let mut conn = pool.get().await.unwrap();
/// assert_eq!(pool.available(), 2);
/// conn.release().unwrap();
/// assert_eq!(pool.available(), 3);
/// # });
/// ```
pub struct ConnectionPool<C: Connection> {
    shared: Arc<PoolShared<C>>,
}

impl<C: Connection> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Connection> ConnectionPool<C> {
    /// Create a pool, eagerly opening `initial_size` connections
    pub async fn new<F>(factory: F, config: PoolConfiguration) -> PoolResult<Self>
    where
        F: ConnectionFactory<Connection = C>,
    {
        Self::with_cancel(factory, config, &CancellationToken::new()).await
    }

    /// Create a pool, handing `cancel` to the factory for the eager connections.
    ///
    /// Fails without returning a partial pool if any eager connection fails.
    pub async fn with_cancel<F>(
        factory: F,
        config: PoolConfiguration,
        cancel: &CancellationToken,
    ) -> PoolResult<Self>
    where
        F: ConnectionFactory<Connection = C>,
    {
        let config = config.normalized();
        let queues = Arc::new(Queues::new(config.capacity));
        let shared = Arc::new(PoolShared {
            queues: RwLock::new(Some(Arc::clone(&queues))),
            factory: Arc::new(factory),
            policy: EvictionPolicy::from_config(&config),
            capacity: config.capacity,
            acquire_timeout: config.acquire_timeout,
            metrics: MetricsTracker::new(),
        });

        for _ in 0..config.initial_size {
            match shared.connect(cancel).await {
                Ok(cell) => {
                    let _ = queues.slots.push(Some(cell));
                }
                Err(err) => {
                    shared.drain(&queues);
                    return Err(err);
                }
            }
        }
        for _ in config.initial_size..config.capacity {
            let _ = queues.slots.push(None);
        }

        tracing::info!(
            capacity = config.capacity,
            initial = config.initial_size,
            "connection pool created"
        );
        Ok(Self { shared })
    }

    /// Check out a connection, bounded by the configured acquire timeout if any
    pub async fn get(&self) -> PoolResult<PooledConnection<C>> {
        match self.shared.acquire_timeout {
            Some(timeout) => self.get_timeout(timeout).await,
            None => self.get_with(&CancellationToken::new()).await,
        }
    }

    /// Check out a connection, failing with [`PoolError::Timeout`] after `timeout`
    pub async fn get_timeout(&self, timeout: Duration) -> PoolResult<PooledConnection<C>> {
        let cancel = CancellationToken::new();
        let _cancel_on_exit = cancel.clone().drop_guard();

        match tokio::time::timeout(timeout, self.get_with(&cancel)).await {
            Ok(result) => result,
            Err(_) => {
                MetricsTracker::incr(&self.shared.metrics.acquire_timeouts);
                Err(PoolError::Timeout)
            }
        }
    }

    /// Check out a connection, waiting until a slot frees up or `cancel` fires.
    ///
    /// The token is also passed to the factory when a new connection is needed.
    pub async fn get_with(&self, cancel: &CancellationToken) -> PoolResult<PooledConnection<C>> {
        let queues = self.shared.queues().ok_or(PoolError::Closed)?;

        let permit = tokio::select! {
            biased;
            permit = queues.permits.acquire() => permit.map_err(|_| PoolError::Closed)?,
            _ = cancel.cancelled() => {
                MetricsTracker::incr(&self.shared.metrics.acquire_timeouts);
                return Err(PoolError::Timeout);
            }
        };

        let mut placeholder = PlaceholderGuard {
            queues: &queues,
            armed: true,
        };
        let reused = queues
            .slots
            .pop()
            .flatten()
            .and_then(|cell| self.shared.reuse(cell, Instant::now()));

        let cell = match reused {
            Some(cell) => cell,
            None => {
                let cell = self.shared.connect(cancel).await?;
                cell.usage.increment();
                cell
            }
        };

        // Put the connection straight back so other callers can share it.
        placeholder.armed = false;
        if queues.slots.push(Some(Arc::clone(&cell))).is_err() {
            tracing::warn!("slot queue full, connection will not be shared");
        }

        if queues.permits.is_closed() {
            // close() ran while we were connecting
            self.shared.drain(&queues);
            cell.usage.decrement();
            self.shared.close_cell(&cell);
            return Err(PoolError::Closed);
        }

        permit.forget();
        MetricsTracker::incr(&self.shared.metrics.total_acquired);
        Ok(PooledConnection::new(cell, Arc::clone(&self.shared)))
    }

    /// Close the pool and every connection it holds.
    ///
    /// Outstanding handles stay valid to drop; releasing them reports
    /// [`PoolError::Closed`].
    pub fn close(&self) {
        let Some(queues) = self.shared.queues.write().take() else {
            return;
        };
        queues.permits.close();
        let closed = self.shared.drain(&queues);
        tracing::info!(closed, "connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.queues.read().is_none()
    }

    /// Configured number of slots, 0 once closed
    pub fn capacity(&self) -> usize {
        if self.is_closed() { 0 } else { self.shared.capacity }
    }

    /// Free slots, 0 once closed
    pub fn available(&self) -> usize {
        self.shared
            .queues()
            .map_or(0, |queues| queues.permits.available_permits())
    }

    /// Unhealthy connections waiting in quarantine
    pub fn quarantined(&self) -> usize {
        self.shared.queues().map_or(0, |queues| queues.quarantine.len())
    }

    /// Close quarantined connections nobody uses anymore.
    ///
    /// Quarantined connections are otherwise only closed by [`close`](Self::close).
    /// Returns the number of connections closed.
    pub fn purge_quarantine(&self) -> usize {
        let Some(queues) = self.shared.queues() else {
            return 0;
        };

        let mut closed = 0;
        for _ in 0..queues.quarantine.len() {
            let Some(cell) = queues.quarantine.pop() else {
                break;
            };
            if cell.is_closed() {
                continue;
            }
            if cell.usage.get() <= 0 {
                if self.shared.close_cell(&cell) {
                    closed += 1;
                }
            } else {
                queues.quarantine.push(cell);
            }
        }

        if closed > 0 {
            tracing::debug!(closed, "quarantined connections purged");
        }
        closed
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::new(
            self.available(),
            self.capacity(),
            self.quarantined(),
            self.is_closed(),
        )
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.shared.metrics.get_metrics(self.available(), self.capacity())
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        crate::metrics::MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BoxError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockConnection {
        id: usize,
        closed: Arc<AtomicBool>,
    }

    impl Connection for MockConnection {
        fn close(&self) -> Result<(), BoxError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockFactory {
        created: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
        closed_flags: Arc<parking_lot::Mutex<Vec<Arc<AtomicBool>>>>,
    }

    impl MockFactory {
        fn created(&self) -> usize {
            self.created.load(Ordering::SeqCst)
        }

        fn closed(&self) -> usize {
            self.closed_flags
                .lock()
                .iter()
                .filter(|flag| flag.load(Ordering::SeqCst))
                .count()
        }
    }

    #[async_trait::async_trait]
    impl ConnectionFactory for MockFactory {
        type Connection = MockConnection;

        async fn connect(&self, _cancel: CancellationToken) -> Result<MockConnection, BoxError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err("dial failed".into());
            }
            let id = self.created.fetch_add(1, Ordering::SeqCst);
            let closed = Arc::new(AtomicBool::new(false));
            self.closed_flags.lock().push(Arc::clone(&closed));
            Ok(MockConnection { id, closed })
        }
    }

    async fn pool_with(
        factory: &MockFactory,
        config: PoolConfiguration,
    ) -> ConnectionPool<MockConnection> {
        ConnectionPool::new(factory.clone(), config).await.unwrap()
    }

    #[tokio::test]
    async fn test_construction_warms_connections() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(3).with_initial_size(2)).await;

        assert_eq!(factory.created(), 2);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.available(), 3);
    }

    #[tokio::test]
    async fn test_construction_fails_on_factory_error() {
        let factory = MockFactory::default();
        factory.fail.store(true, Ordering::SeqCst);

        let result = ConnectionPool::new(
            factory.clone(),
            PoolConfiguration::new().with_capacity(2).with_initial_size(1),
        )
        .await;

        assert!(matches!(result, Err(PoolError::Factory(_))));
    }

    /// Leaves `a` and `c` sharing connection 0 and connection 1 idle in the queue.
    async fn shared_checkouts(
        pool: &ConnectionPool<MockConnection>,
    ) -> (PooledConnection<MockConnection>, PooledConnection<MockConnection>) {
        let a = pool.get().await.unwrap();
        let mut b = pool.get().await.unwrap();
        b.release().unwrap();
        let c = pool.get().await.unwrap();
        (a, c)
    }

    #[tokio::test]
    async fn test_checkouts_share_connection() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(2).with_initial_size(1)).await;

        let (mut a, mut c) = shared_checkouts(&pool).await;
        assert_eq!(a.id, 0);
        assert_eq!(c.id, 0);
        assert_eq!(a.concurrency(), 2);
        assert_eq!(pool.available(), 0);
        assert_eq!(factory.created(), 2);

        a.release().unwrap();
        assert_eq!(c.concurrency(), 1);
        c.release().unwrap();
        assert_eq!(pool.available(), 2);
        assert_eq!(factory.closed(), 0);
    }

    #[tokio::test]
    async fn test_waiter_reuses_released_connection() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(1).with_initial_size(1)).await;

        let mut conn = pool.get().await.unwrap();
        assert_eq!(conn.concurrency(), 1);

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move {
                let mut conn = pool.get().await.unwrap();
                let id = conn.id;
                conn.release().unwrap();
                id
            })
        };

        tokio::task::yield_now().await;
        let id = conn.id;
        conn.release().unwrap();
        assert_eq!(waiter.await.unwrap(), id);
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test]
    async fn test_factory_failure_restores_slot() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(2)).await;

        factory.fail.store(true, Ordering::SeqCst);
        let err = pool.get().await.unwrap_err();
        assert!(matches!(err, PoolError::Factory(_)));
        assert_eq!(pool.available(), 2);

        factory.fail.store(false, Ordering::SeqCst);
        let mut conn = pool.get().await.unwrap();
        assert_eq!(pool.available(), 1);
        conn.release().unwrap();
        assert_eq!(pool.get_metrics().factory_failures, 1);
    }

    #[tokio::test]
    async fn test_unhealthy_last_user_closes_connection() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(1).with_initial_size(1)).await;

        let mut conn = pool.get().await.unwrap();
        conn.mark_unhealthy();
        conn.mark_unhealthy();
        conn.release().unwrap();
        assert!(!conn.is_healthy());
        assert_eq!(factory.closed(), 1);
        assert_eq!(pool.quarantined(), 0);

        let conn = pool.get().await.unwrap();
        assert_eq!(conn.id, 1);
        assert_eq!(factory.created(), 2);
    }

    #[tokio::test]
    async fn test_unhealthy_shared_connection_quarantined() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(2).with_initial_size(1)).await;

        let (mut a, mut c) = shared_checkouts(&pool).await;
        a.mark_unhealthy();
        a.release().unwrap();
        assert_eq!(pool.quarantined(), 1);
        assert_eq!(factory.closed(), 0);

        // the last user does not close it; quarantine is drained lazily
        c.release().unwrap();
        assert_eq!(pool.quarantined(), 1);
        assert_eq!(factory.closed(), 0);
        assert_eq!(pool.available(), 2);

        assert_eq!(pool.purge_quarantine(), 1);
        assert_eq!(pool.quarantined(), 0);
        assert_eq!(factory.closed(), 1);

        // connection 1 is next in line, then the retired slot gets a new connection
        let first = pool.get().await.unwrap();
        let second = pool.get().await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_purge_skips_connections_in_use() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(2).with_initial_size(1)).await;

        let (mut a, _c) = shared_checkouts(&pool).await;
        a.mark_unhealthy();
        a.release().unwrap();

        assert_eq!(pool.purge_quarantine(), 0);
        assert_eq!(pool.quarantined(), 1);
    }

    #[tokio::test]
    async fn test_quarantine_closed_at_pool_close() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(2).with_initial_size(1)).await;

        let (mut a, mut c) = shared_checkouts(&pool).await;
        a.mark_unhealthy();
        a.release().unwrap();

        pool.close();
        assert_eq!(factory.closed(), 2);
        assert!(pool.is_closed());
        assert_eq!(pool.quarantined(), 0);
        assert!(matches!(c.release(), Err(PoolError::Closed)));
        assert!(!c.is_released());
    }

    #[tokio::test]
    async fn test_expired_shared_connection_leaves_quarantine_once_closed() {
        let factory = MockFactory::default();
        let pool = pool_with(
            &factory,
            PoolConfiguration::new()
                .with_capacity(2)
                .with_initial_size(1)
                .with_max_lifetime(Duration::from_millis(50)),
        )
        .await;

        let (mut a, mut c) = shared_checkouts(&pool).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        a.release().unwrap();
        assert_eq!(pool.quarantined(), 1);
        assert_eq!(factory.closed(), 0);

        c.release().unwrap();
        assert_eq!(factory.closed(), 1);
        assert_eq!(pool.quarantined(), 0);

        let health = pool.get_health_status();
        assert_eq!(health.quarantined, 0);
        assert!(!health.warnings.iter().any(|w| w.contains("awaiting close")));
    }

    #[tokio::test]
    async fn test_released_handle_tracks_shared_concurrency() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(2).with_initial_size(1)).await;

        let (mut a, mut c) = shared_checkouts(&pool).await;
        a.release().unwrap();
        assert!(a.is_released());
        assert!(a.connection().is_none());
        assert_eq!(a.concurrency(), 1);

        c.release().unwrap();
        assert_eq!(a.concurrency(), 0);
        assert_eq!(c.concurrency(), 0);
    }

    #[tokio::test]
    async fn test_dropped_acquire_restores_slot() {
        let pool = ConnectionPool::new(
            |cancel: CancellationToken| async move {
                cancel.cancelled().await;
                Err::<MockConnection, BoxError>("cancelled".into())
            },
            PoolConfiguration::new().with_capacity(1),
        )
        .await
        .unwrap();

        let err = pool.get_timeout(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, PoolError::Timeout));
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.get_metrics().acquire_timeouts, 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_times_out_waiter() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(1)).await;
        let _held = pool.get().await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = pool.get_with(&cancel).await.unwrap_err();
        assert!(matches!(err, PoolError::Timeout));
    }

    #[tokio::test]
    async fn test_drop_releases_checkout() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(2)).await;

        {
            let _conn = pool.get().await.unwrap();
            assert_eq!(pool.available(), 1);
        }

        assert_eq!(pool.available(), 2);
        assert_eq!(pool.get_metrics().total_released, 1);
    }

    #[tokio::test]
    async fn test_waiter_sees_close() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(1)).await;
        let _held = pool.get().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.get().await })
        };
        tokio::task::yield_now().await;

        pool.close();
        assert!(matches!(waiter.await.unwrap(), Err(PoolError::Closed)));
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let factory = MockFactory::default();
        let pool = pool_with(&factory, PoolConfiguration::new().with_capacity(1)).await;
        assert!(pool.get_health_status().is_healthy());

        let mut conn = pool.get().await.unwrap();
        let health = pool.get_health_status();
        assert!(!health.is_healthy());
        assert_eq!(health.outstanding, 1);
        conn.release().unwrap();

        let exported = pool.export_metrics();
        assert_eq!(exported["total_acquired"], "1");
        assert_eq!(exported["connections_created"], "1");

        pool.close();
        assert!(!pool.get_health_status().is_healthy());
    }
}
