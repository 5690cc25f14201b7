//! Database driver trait definition

use crate::{Connection, ConnectionSettings, Result};
use async_trait::async_trait;

/// Core driver trait that establishes connections from settings.
///
/// The pool calls `connect` once per slot when it opens and again for every
/// self-heal attempt, so implementations must apply every connect option
/// (timeouts, charset) from `settings` on each call.
///
/// Errors returned as [`SqlgateError::Driver`](crate::SqlgateError::Driver) are
/// reported as driver-initialization failures; anything else counts as a
/// socket-connect failure.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "mysql")
    fn name(&self) -> &'static str;

    /// Default connection port
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Establish a new connection
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn Connection>>;
}
