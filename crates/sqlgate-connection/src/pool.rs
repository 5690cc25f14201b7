//! Bounded connection pooling
//!
//! A pool opens a fixed number of connections up front and hands them out
//! one lease at a time. A counting semaphore (the gate) holds one permit per
//! idle connection, so at most `capacity` leases exist at once and a fetch on
//! an exhausted pool waits up to the fetch timeout.
//!
//! # Example
//!
//! ```ignore
//! use sqlgate_connection::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(5).with_fetch_timeout_ms(1000);
//! let pool = ConnectionPool::open(driver, settings, config).await?;
//!
//! let mut lease = pool.fetch().await?;
//! let outcome = pool.execute(&mut lease, "SELECT 1").await?;
//! pool.recycle(lease);
//!
//! pool.close().await;
//! ```

mod blocking;
mod config;
mod lease;
mod pool;
mod stats;


pub use blocking::BlockingPool;
pub use config::{DEFAULT_FETCH_TIMEOUT_MS, MAX_POOL_SIZE, PoolConfig};
pub use lease::Lease;
pub use pool::ConnectionPool;
pub use stats::PoolStats;
