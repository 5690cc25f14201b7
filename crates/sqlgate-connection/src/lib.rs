//! sqlgate connection - bounded pooling with self-healing connections
//!
//! This crate gates access to a fixed set of live database connections and
//! repairs a connection inline when a query on it fails.

pub mod pool;
pub mod reconnect;

#[cfg(test)]
mod test_support;

pub use pool::{BlockingPool, ConnectionPool, Lease, MAX_POOL_SIZE, PoolConfig, PoolStats};
pub use reconnect::{ConnectionState, ManagedConnection, OperationStatus, QueryOutcome};
