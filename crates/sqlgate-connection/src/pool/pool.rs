//! Connection pool implementation

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use sqlgate_core::{ConnectionSettings, DatabaseDriver, Result, SqlgateError};
use tokio::sync::Semaphore;

use super::config::PoolConfig;
use super::lease::Lease;
use super::stats::PoolStats;
use crate::reconnect::{ManagedConnection, QueryOutcome};

/// State shared between a pool and its outstanding leases
pub(super) struct PoolInner {
    settings: Arc<ConnectionSettings>,
    capacity: usize,
    fetch_timeout: Duration,
    /// FIFO of idle connections; connections are taken from the head
    available: Mutex<VecDeque<ManagedConnection>>,
    /// One permit per connection in `available`
    gate: Semaphore,
    closed: AtomicBool,
    leased: AtomicUsize,
    waiting: AtomicUsize,
    timeouts: AtomicU64,
    reconnects: AtomicU64,
}

impl PoolInner {
    /// Put a connection back at the tail, or close it if the pool is gone
    pub(super) fn return_connection(&self, conn: ManagedConnection) {
        self.leased.fetch_sub(1, Ordering::SeqCst);

        let mut available = self.available.lock();
        if self.closed.load(Ordering::SeqCst) {
            drop(available);
            tracing::debug!(
                connection_id = ?conn.connection_id(),
                "pool closed, closing returned connection"
            );
            conn.close_detached();
            return;
        }
        available.push_back(conn);
        drop(available);

        self.gate.add_permits(1);
        tracing::debug!("connection recycled");
    }
}

/// Decrements the waiting count even if the fetch future is dropped
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A fixed-size pool of self-healing connections
///
/// Every connection is opened up front. Callers `fetch` a [`Lease`], run
/// statements through [`ConnectionPool::execute`] and give the lease back with
/// [`ConnectionPool::recycle`] (or by dropping it).
///
/// Cloning is cheap; clones share the same connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Open `config.capacity()` connections.
    ///
    /// Fails on the first connection that cannot be established, closing the
    /// ones already opened. The error names the failing slot and whether the
    /// driver or the socket connect failed.
    pub async fn open(
        driver: Arc<dyn DatabaseDriver>,
        settings: ConnectionSettings,
        config: PoolConfig,
    ) -> Result<Self> {
        settings.validate().inspect_err(|e| {
            tracing::error!(error = %e, "invalid connection settings");
        })?;

        let capacity = config.capacity();
        if i64::try_from(capacity).ok() != Some(config.requested_size()) {
            tracing::warn!(
                requested = config.requested_size(),
                capacity,
                "requested pool size out of range, clamped"
            );
        }

        tracing::info!(
            driver = driver.name(),
            host = %settings.host,
            port = settings.port,
            user = %settings.user,
            database = %settings.database,
            capacity,
            "opening connection pool"
        );

        let settings = Arc::new(settings);
        let mut opened = VecDeque::with_capacity(capacity);
        for slot in 0..capacity {
            match ManagedConnection::open(driver.clone(), settings.clone()).await {
                Ok(conn) => opened.push_back(conn),
                Err(e) => {
                    let stage = e.init_stage();
                    tracing::error!(slot, stage = %stage, error = %e, "failed to open connection");
                    for mut conn in opened {
                        conn.close().await;
                    }
                    return Err(SqlgateError::Initialization {
                        slot,
                        stage,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(capacity, database = %settings.database, "connection pool open");

        Ok(Self {
            inner: Arc::new(PoolInner {
                settings,
                capacity,
                fetch_timeout: config.fetch_timeout(),
                available: Mutex::new(opened),
                gate: Semaphore::new(capacity),
                closed: AtomicBool::new(false),
                leased: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                timeouts: AtomicU64::new(0),
                reconnects: AtomicU64::new(0),
            }),
        })
    }

    /// Take the connection at the head of the available set.
    ///
    /// Waits up to the fetch timeout. Returns [`SqlgateError::Timeout`]
    /// (retriable) if nothing was returned in time and
    /// [`SqlgateError::PoolClosed`] if the pool was closed.
    pub async fn fetch(&self) -> Result<Lease> {
        let inner = &self.inner;

        let acquired = {
            let _waiting = WaitingGuard::new(&inner.waiting);
            tokio::time::timeout(inner.fetch_timeout, inner.gate.acquire()).await
        };

        let permit = match acquired {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                tracing::warn!("wait failed: connection pool is closed");
                return Err(SqlgateError::PoolClosed);
            }
            Err(_) => {
                inner.timeouts.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(
                    timeout_ms = inner.fetch_timeout.as_millis() as u64,
                    "timed out waiting for a pooled connection"
                );
                return Err(SqlgateError::Timeout(format!(
                    "no connection available within {:?}",
                    inner.fetch_timeout
                )));
            }
        };
        // The permit now belongs to the lease; recycle adds it back.
        permit.forget();

        let conn = inner.available.lock().pop_front();
        match conn {
            Some(conn) => {
                inner.leased.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(connection_id = ?conn.connection_id(), "connection fetched");
                Ok(Lease::new(inner.clone(), conn))
            }
            // close() drained the set between the permit and the pop
            None => Err(SqlgateError::PoolClosed),
        }
    }

    /// Run `sql` on the leased connection, reconnecting and retrying once on failure
    pub async fn execute(&self, lease: &mut Lease, sql: &str) -> Result<QueryOutcome> {
        if !lease.belongs_to(&self.inner) {
            return Err(SqlgateError::Configuration(
                "lease was fetched from a different pool".into(),
            ));
        }
        let conn = lease.managed_mut()?;
        let before = conn.reconnect_count();
        let result = conn.execute_with_reconnect(sql).await;
        let reconnects = conn.reconnect_count() - before;
        if reconnects > 0 {
            self.inner.reconnects.fetch_add(reconnects, Ordering::SeqCst);
        }
        result
    }

    /// Return a lease to the available set, whatever its last status.
    ///
    /// Broken connections are healed by the next `execute` that uses them.
    pub fn recycle(&self, lease: Lease) {
        if !lease.belongs_to(&self.inner) {
            tracing::warn!("recycling a lease into a different pool, returning it to its owner");
        }
        drop(lease);
    }

    /// Close the gate and every available connection.
    ///
    /// Waiters wake with `PoolClosed`. Leases still out are closed when they
    /// come back. Returns how many connections were closed; closing again
    /// returns 0.
    pub async fn close(&self) -> usize {
        let drained: Vec<ManagedConnection> = {
            let mut available = self.inner.available.lock();
            if self.inner.closed.swap(true, Ordering::SeqCst) {
                return 0;
            }
            self.inner.gate.close();
            available.drain(..).collect()
        };

        let mut closed = 0;
        for mut conn in drained {
            if conn.close().await {
                closed += 1;
            }
        }

        tracing::info!(
            closed,
            outstanding = self.inner.leased.load(Ordering::SeqCst),
            database = %self.inner.settings.database,
            "connection pool closed"
        );
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Settings shared by every connection in the pool
    pub fn settings(&self) -> &ConnectionSettings {
        &self.inner.settings
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        PoolStats {
            capacity: inner.capacity,
            available: inner.available.lock().len(),
            leased: inner.leased.load(Ordering::SeqCst),
            waiting: inner.waiting.load(Ordering::SeqCst),
            timeouts: inner.timeouts.load(Ordering::SeqCst),
            reconnects: inner.reconnects.load(Ordering::SeqCst),
        }
    }

    /// Emit current statistics at info level
    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::info!(
            capacity = stats.capacity,
            available = stats.available,
            leased = stats.leased,
            waiting = stats.waiting,
            timeouts = stats.timeouts,
            reconnects = stats.reconnects,
            utilization = stats.utilization(),
            "connection pool statistics"
        );
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("database", &self.inner.settings.database)
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}
