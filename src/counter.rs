//! Usage counting for multiplexed connections

use std::sync::atomic::{AtomicI32, Ordering};

/// Number of concurrent checkouts of one physical connection.
///
/// A counter lives inside the shared cell of its connection, so every handle
/// and every queue slot that refers to the connection observes the same value.
///
/// # Examples
///
/// ```
/// use connpool::UsageCounter;
///
/// let counter = UsageCounter::new();
/// assert_eq!(counter.increment(), 1);
/// assert_eq!(counter.increment(), 2);
/// assert_eq!(counter.decrement(), 1);
/// assert_eq!(counter.get(), 1);
/// ```
#[derive(Debug, Default)]
pub struct UsageCounter {
    count: AtomicI32,
}

impl UsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a checkout, returning the updated count
    pub fn increment(&self) -> i32 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a release, returning the updated count
    pub fn decrement(&self) -> i32 {
        self.count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// Snapshot of the current count
    pub fn get(&self) -> i32 {
        self.count.load(Ordering::SeqCst)
    }
}
