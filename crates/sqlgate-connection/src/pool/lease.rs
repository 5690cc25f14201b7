//! Exclusive handle on one pooled connection

use std::sync::Arc;

use sqlgate_core::{Result, SqlgateError};

use super::pool::PoolInner;
use crate::reconnect::{ConnectionState, ManagedConnection, OperationStatus};

/// A connection borrowed from the pool
///
/// When dropped, the connection is returned to the tail of the pool's
/// available set (or closed, if the pool was closed meanwhile).
pub struct Lease {
    conn: Option<ManagedConnection>,
    pool: Arc<PoolInner>,
}

impl Lease {
    pub(super) fn new(pool: Arc<PoolInner>, conn: ManagedConnection) -> Self {
        Self {
            conn: Some(conn),
            pool,
        }
    }

    pub(super) fn belongs_to(&self, pool: &Arc<PoolInner>) -> bool {
        Arc::ptr_eq(&self.pool, pool)
    }

    pub(super) fn managed_mut(&mut self) -> Result<&mut ManagedConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlgateError::Connection("lease no longer holds a connection".into()))
    }

    /// Server-side id of the leased socket, if one is open
    pub fn connection_id(&self) -> Option<u64> {
        self.conn.as_ref().and_then(|c| c.connection_id())
    }

    pub fn state(&self) -> ConnectionState {
        self.conn
            .as_ref()
            .map_or(ConnectionState::Failed, |c| c.state())
    }

    pub fn last_status(&self) -> OperationStatus {
        self.conn
            .as_ref()
            .map_or(OperationStatus::Failure, |c| c.last_status())
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.return_connection(conn);
        }
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("connection", &self.conn).finish()
    }
}
