//! Self-healing connections
//!
//! A [`ManagedConnection`] owns one socket plus the settings needed to
//! re-establish it. When a query fails it closes the socket, reconnects once
//! and retries the query once before giving up.
//!
//! # Example
//!
//! ```ignore
//! use sqlgate_connection::reconnect::ManagedConnection;
//!
//! let mut conn = ManagedConnection::open(driver, settings).await?;
//! let outcome = conn.execute_with_reconnect("SELECT 1").await?;
//! if outcome.reconnected() {
//!     // the socket was replaced before the query succeeded
//! }
//! ```

mod managed;
mod outcome;
mod state;


pub use managed::ManagedConnection;
pub use outcome::QueryOutcome;
pub use state::{ConnectionState, OperationStatus};
