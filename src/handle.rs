//! Checked-out connections and the shared per-connection cell

use crate::counter::UsageCounter;
use crate::errors::{PoolError, PoolResult};
use crate::eviction::ConnectionMetadata;
use crate::factory::Connection;
use crate::pool::PoolShared;

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// State shared by every handle and queue slot referring to one connection
pub(crate) struct ConnectionCell<C> {
    conn: C,
    pub usage: UsageCounter,
    pub meta: ConnectionMetadata,
    unhealthy: AtomicBool,
    closed: AtomicBool,
}

impl<C: Connection> ConnectionCell<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            usage: UsageCounter::new(),
            meta: ConnectionMetadata::new(),
            unhealthy: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Flag the connection as not reusable, returning true on the first call
    pub fn mark_unhealthy(&self) -> bool {
        !self.unhealthy.swap(true, Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Unhealthy or closed connections never serve new checkouts
    pub fn is_retired(&self) -> bool {
        self.unhealthy.load(Ordering::SeqCst) || self.is_closed()
    }

    /// Close the connection once; later calls are no-ops returning false
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Err(err) = self.conn.close() {
            tracing::warn!(error = %err, "failed to close pooled connection");
        }
        true
    }
}

/// A connection checked out of a [`ConnectionPool`](crate::ConnectionPool).
///
/// The connection may be shared with other concurrent checkouts. Call
/// [`release`](Self::release) when done; dropping the handle releases it too.
pub struct PooledConnection<C: Connection> {
    cell: Arc<ConnectionCell<C>>,
    released: bool,
    unhealthy: bool,
    pool: Arc<PoolShared<C>>,
}

impl<C: Connection> PooledConnection<C> {
    pub(crate) fn new(cell: Arc<ConnectionCell<C>>, pool: Arc<PoolShared<C>>) -> Self {
        Self {
            cell,
            released: false,
            unhealthy: false,
            pool,
        }
    }

    /// The underlying connection, `None` once released
    pub fn connection(&self) -> Option<&C> {
        (!self.released).then_some(&self.cell.conn)
    }

    /// Mark the connection as broken so it is retired on release
    pub fn mark_unhealthy(&mut self) {
        self.unhealthy = true;
    }

    pub fn is_healthy(&self) -> bool {
        !self.unhealthy
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Number of checkouts currently sharing this connection.
    ///
    /// Keeps tracking the shared counter after this handle is released.
    pub fn concurrency(&self) -> i32 {
        self.cell.usage.get()
    }

    /// When the underlying connection was created
    pub fn created_at(&self) -> Instant {
        self.cell.meta.created_at
    }

    /// Return the checkout to the pool.
    ///
    /// Retires the connection if it was marked unhealthy or outlived the
    /// pool's maximum lifetime. A second call fails with
    /// [`PoolError::AlreadyClosed`]; on a closed pool the call fails with
    /// [`PoolError::Closed`] and leaves the handle untouched.
    pub fn release(&mut self) -> PoolResult<()> {
        if self.released {
            return Err(PoolError::AlreadyClosed);
        }
        self.pool.check_in(&self.cell, &mut self.unhealthy)?;
        self.released = true;
        Ok(())
    }

    /// Same as [`release`](Self::release)
    pub fn close(&mut self) -> PoolResult<()> {
        self.release()
    }
}

impl<C: Connection> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.connection().expect("connection already released")
    }
}

impl<C: Connection> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.release();
        }
    }
}

impl<C: Connection> std::fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("released", &self.is_released())
            .field("healthy", &self.is_healthy())
            .field("concurrency", &self.concurrency())
            .finish()
    }
}
