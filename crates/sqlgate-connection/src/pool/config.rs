//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest number of connections a single pool will hold
pub const MAX_POOL_SIZE: usize = 256;

/// Default wait for a free connection
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 1000;

const DEFAULT_POOL_SIZE: i64 = 3;

/// Configuration for a connection pool
///
/// The requested size is kept as given and clamped when the pool opens, so a
/// bad value never prevents a pool from being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Requested number of connections, before clamping
    requested_size: i64,
    /// How long `fetch` waits for a free connection, in milliseconds
    #[serde(default = "default_fetch_timeout_ms")]
    fetch_timeout_ms: u64,
}

fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}

impl PoolConfig {
    /// Create a pool configuration for `requested_size` connections
    pub fn new(requested_size: i64) -> Self {
        Self {
            requested_size,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }

    /// Set the fetch timeout in milliseconds
    pub fn with_fetch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.fetch_timeout_ms = timeout_ms;
        self
    }

    /// The size as requested
    pub fn requested_size(&self) -> i64 {
        self.requested_size
    }

    /// The number of connections the pool will actually open
    ///
    /// ```
    /// use sqlgate_connection::{MAX_POOL_SIZE, PoolConfig};
    ///
    /// assert_eq!(PoolConfig::new(8).capacity(), 8);
    /// assert_eq!(PoolConfig::new(0).capacity(), MAX_POOL_SIZE);
    /// assert_eq!(PoolConfig::new(-4).capacity(), MAX_POOL_SIZE);
    /// assert_eq!(PoolConfig::new(10_000).capacity(), MAX_POOL_SIZE);
    /// ```
    pub fn capacity(&self) -> usize {
        clamp_capacity(self.requested_size)
    }

    /// Get the fetch timeout as a Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for PoolConfig {
    /// Three connections, one second fetch timeout
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

/// Non-positive requests mean "as many as allowed"; everything else is capped
fn clamp_capacity(requested: i64) -> usize {
    if requested <= 0 {
        return MAX_POOL_SIZE;
    }
    usize::try_from(requested).map_or(MAX_POOL_SIZE, |n| n.min(MAX_POOL_SIZE))
}
