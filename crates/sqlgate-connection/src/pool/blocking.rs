//! Blocking facade for callers on plain OS threads

use std::sync::Arc;

use sqlgate_core::{ConnectionSettings, DatabaseDriver, Result};

use super::config::PoolConfig;
use super::lease::Lease;
use super::pool::ConnectionPool;
use super::stats::PoolStats;
use crate::reconnect::QueryOutcome;

/// A [`ConnectionPool`] driven by its own tokio runtime.
///
/// Every method blocks the calling thread. Share it between threads with an
/// `Arc`; do not call it from inside an async context.
///
/// # Example
///
/// ```ignore
/// let pool = Arc::new(BlockingPool::open(driver, settings, PoolConfig::new(4))?);
/// let handles: Vec<_> = (0..8)
///     .map(|_| {
///         let pool = pool.clone();
///         std::thread::spawn(move || -> sqlgate_core::Result<()> {
///             let mut lease = pool.fetch()?;
///             pool.execute(&mut lease, "SELECT 1")?;
///             pool.recycle(lease);
///             Ok(())
///         })
///     })
///     .collect();
/// ```
pub struct BlockingPool {
    // Declared before the runtime so connections drop while it is still alive.
    pool: ConnectionPool,
    runtime: tokio::runtime::Runtime,
}

impl BlockingPool {
    pub fn open(
        driver: Arc<dyn DatabaseDriver>,
        settings: ConnectionSettings,
        config: PoolConfig,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("sqlgate-runtime")
            .build()?;
        let pool = runtime.block_on(ConnectionPool::open(driver, settings, config))?;
        Ok(Self { pool, runtime })
    }

    pub fn fetch(&self) -> Result<Lease> {
        self.runtime.block_on(self.pool.fetch())
    }

    pub fn execute(&self, lease: &mut Lease, sql: &str) -> Result<QueryOutcome> {
        self.runtime.block_on(self.pool.execute(lease, sql))
    }

    pub fn recycle(&self, lease: Lease) {
        self.pool.recycle(lease);
    }

    pub fn close(&self) -> usize {
        self.runtime.block_on(self.pool.close())
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// The async pool underneath
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl Drop for BlockingPool {
    fn drop(&mut self) {
        self.runtime.block_on(self.pool.close());
    }
}
