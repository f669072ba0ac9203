//! Pool configuration options

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for connection pool behavior
///
/// `None` and `Duration::ZERO` both disable a timeout.
///
/// # Examples
///
/// ```
/// use connpool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_capacity(8)
///     .with_initial_size(2)
///     .with_idle_timeout(Duration::from_secs(60))
///     .with_max_lifetime(Duration::from_secs(3600));
///
/// assert_eq!(config.capacity, 8);
/// assert_eq!(config.initial_size, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfiguration {
    /// Number of checkout slots; also the upper bound on live connections
    pub capacity: usize,

    /// Connections created eagerly when the pool is built
    pub initial_size: usize,

    /// Connections unused for longer than this are replaced on the next acquire
    pub idle_timeout: Option<Duration>,

    /// Connections older than this are retired when released
    pub max_lifetime: Option<Duration>,

    /// Wait bound used by `ConnectionPool::get`
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            capacity: 10,
            initial_size: 0,
            idle_timeout: None,
            max_lifetime: None,
            acquire_timeout: None,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of slots
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of connections created up front
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = Some(lifetime);
        self
    }

    /// Bound the wait of `ConnectionPool::get`
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Coerce the configuration into a usable shape.
    ///
    /// Capacity is raised to at least one, the initial size is clamped to the
    /// capacity and zero durations become `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use connpool::PoolConfiguration;
    /// use std::time::Duration;
    ///
    /// let config = PoolConfiguration::new()
    ///     .with_capacity(0)
    ///     .with_initial_size(5)
    ///     .with_idle_timeout(Duration::ZERO)
    ///     .normalized();
    ///
    /// assert_eq!(config.capacity, 1);
    /// assert_eq!(config.initial_size, 1);
    /// assert_eq!(config.idle_timeout, None);
    /// ```
    pub fn normalized(mut self) -> Self {
        if self.capacity == 0 {
            tracing::debug!("pool capacity 0 raised to 1");
            self.capacity = 1;
        }
        if self.initial_size > self.capacity {
            tracing::debug!(
                initial_size = self.initial_size,
                capacity = self.capacity,
                "initial size clamped to capacity"
            );
            self.initial_size = self.capacity;
        }
        self.idle_timeout = self.idle_timeout.filter(|d| !d.is_zero());
        self.max_lifetime = self.max_lifetime.filter(|d| !d.is_zero());
        self.acquire_timeout = self.acquire_timeout.filter(|d| !d.is_zero());
        self
    }
}
