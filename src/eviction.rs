//! Eviction policy for idle and aged connections

use crate::config::PoolConfiguration;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// When pooled connections are retired
///
/// The idle timeout is checked when a slot is taken for a new checkout; the
/// maximum lifetime is checked when a checkout is released.
///
/// # Examples
///
/// ```
/// use connpool::{EvictionPolicy, PoolConfiguration};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new().with_max_lifetime(Duration::from_secs(3600));
/// let policy = EvictionPolicy::from_config(&config);
///
/// assert_eq!(policy.max_lifetime, Some(Duration::from_secs(3600)));
/// assert!(policy.idle_timeout.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Replace connections nobody used for this long
    pub idle_timeout: Option<Duration>,

    /// Retire connections older than this
    pub max_lifetime: Option<Duration>,
}

impl EvictionPolicy {
    pub fn from_config(config: &PoolConfiguration) -> Self {
        Self {
            idle_timeout: config.idle_timeout.filter(|d| !d.is_zero()),
            max_lifetime: config.max_lifetime.filter(|d| !d.is_zero()),
        }
    }

    /// Whether `since + limit` lies before `now`
    fn elapsed_past(since: Instant, limit: Option<Duration>, now: Instant) -> bool {
        match limit.and_then(|limit| since.checked_add(limit)) {
            Some(deadline) => deadline < now,
            None => false,
        }
    }
}

/// Timestamps of one physical connection
#[derive(Debug)]
pub(crate) struct ConnectionMetadata {
    pub created_at: Instant,
    last_released: Mutex<Instant>,
}

impl ConnectionMetadata {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            created_at: now,
            last_released: Mutex::new(now),
        }
    }

    pub fn touch(&self) {
        *self.last_released.lock() = Instant::now();
    }

    pub fn last_released(&self) -> Instant {
        *self.last_released.lock()
    }

    pub fn is_idle_expired(&self, policy: &EvictionPolicy, now: Instant) -> bool {
        EvictionPolicy::elapsed_past(self.last_released(), policy.idle_timeout, now)
    }

    pub fn is_lifetime_expired(&self, policy: &EvictionPolicy, now: Instant) -> bool {
        EvictionPolicy::elapsed_past(self.created_at, policy.max_lifetime, now)
    }
}
