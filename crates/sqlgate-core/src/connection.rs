//! Connection trait implemented by every driver

use crate::{QueryResult, Result};
use async_trait::async_trait;

/// A single live database socket.
///
/// A connection is owned by exactly one pool slot at a time, so every operation
/// takes `&mut self`; there is no interior locking.
#[async_trait]
pub trait Connection: Send {
    /// Get the driver name (e.g., "mysql")
    fn driver_name(&self) -> &str;

    /// Server-side identifier of this session, if the protocol exposes one
    fn connection_id(&self) -> Option<u64> {
        None
    }

    /// Run a statement, returning one result per result set.
    ///
    /// Statements that produce no rows still yield one result carrying the
    /// affected row count.
    async fn query(&mut self, sql: &str) -> Result<Vec<QueryResult>>;

    /// Close the socket. Closing an already closed connection is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver_name())
            .field("connection_id", &self.connection_id())
            .field("closed", &self.is_closed())
            .finish()
    }
}
