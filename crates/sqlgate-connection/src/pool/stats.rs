//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Snapshot of a connection pool's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of connections the pool was opened with
    pub capacity: usize,
    /// Connections waiting in the available set
    pub available: usize,
    /// Connections currently leased
    pub leased: usize,
    /// Callers currently blocked in `fetch`
    pub waiting: usize,
    /// Fetches that gave up after the timeout
    pub timeouts: u64,
    /// Reconnect attempts made by `execute`
    pub reconnects: u64,
}

impl PoolStats {
    /// Calculate pool utilization as a fraction (0.0 to 1.0)
    ///
    /// Returns 0.0 if capacity is 0 to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.leased as f64 / self.capacity as f64
        }
    }

    /// Check if every connection is leased
    pub fn is_exhausted(&self) -> bool {
        self.available == 0 && self.capacity > 0
    }
}
