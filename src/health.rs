//! Health monitoring for connection pools

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Health status of a connection pool
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Current pool utilization (0.0 to 1.0)
    pub utilization: f64,

    /// Free checkout slots
    pub available_slots: usize,

    /// Checkouts held by callers
    pub outstanding: usize,

    /// Total capacity
    pub total_capacity: usize,

    /// Unhealthy connections waiting for teardown
    pub quarantined: usize,

    /// Whether the pool has been closed
    pub is_closed: bool,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Create a new health status
    pub fn new(available: usize, capacity: usize, quarantined: usize, is_closed: bool) -> Self {
        let outstanding = capacity.saturating_sub(available);
        let utilization = if capacity > 0 {
            outstanding as f64 / capacity as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if is_closed {
            warnings.push("Pool is closed".to_string());
            is_healthy = false;
        }

        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if available == 0 && capacity > 0 {
            warnings.push("No free slots".to_string());
        }

        if quarantined > 0 {
            warnings.push(format!("{} unhealthy connection(s) awaiting close", quarantined));
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            available_slots: available,
            outstanding,
            total_capacity: capacity,
            quarantined,
            is_closed,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_pool_is_healthy() {
        let status = HealthStatus::new(4, 4, 0, false);
        assert!(status.is_healthy());
        assert_eq!(status.warning_count, 0);
        assert_eq!(status.outstanding, 0);
    }

    #[test]
    fn test_exhausted_pool_warns() {
        let status = HealthStatus::new(0, 2, 1, false);
        assert!(!status.is_healthy());
        assert_eq!(status.warning_count, 3);
        assert_eq!(status.quarantined, 1);
    }

    #[test]
    fn test_closed_pool_unhealthy() {
        let status = HealthStatus::new(0, 0, 0, true);
        assert!(!status.is_healthy());
        assert_eq!(status.warnings, vec!["Pool is closed".to_string()]);
    }
}
