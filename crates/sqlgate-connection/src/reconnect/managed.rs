//! A connection that re-establishes itself after a failed query

use std::sync::Arc;

use sqlgate_core::{Connection, ConnectionSettings, DatabaseDriver, Result, SqlgateError};

use super::{ConnectionState, OperationStatus, QueryOutcome};

/// One socket plus what it takes to replace it.
///
/// While held by a pool the socket is either open or absent pending the next
/// reconnect; a socket known to be broken is always flagged
/// (`Failed` / `Failure`).
pub struct ManagedConnection {
    driver: Arc<dyn DatabaseDriver>,
    settings: Arc<ConnectionSettings>,
    socket: Option<Box<dyn Connection>>,
    state: ConnectionState,
    last_status: OperationStatus,
    reconnects: u64,
}

impl ManagedConnection {
    /// Establish the initial socket
    pub async fn open(
        driver: Arc<dyn DatabaseDriver>,
        settings: Arc<ConnectionSettings>,
    ) -> Result<Self> {
        let socket = driver.connect(&settings).await?;
        Ok(Self {
            driver,
            settings,
            socket: Some(socket),
            state: ConnectionState::Connected,
            last_status: OperationStatus::Success,
            reconnects: 0,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_status(&self) -> OperationStatus {
        self.last_status
    }

    /// Settings used to (re)establish the socket
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Server-side id of the current socket, if any
    pub fn connection_id(&self) -> Option<u64> {
        self.socket.as_ref().and_then(|s| s.connection_id())
    }

    pub fn has_socket(&self) -> bool {
        self.socket.is_some()
    }

    /// Number of reconnect attempts made over this connection's lifetime
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects
    }

    /// Run `sql`, healing the socket once if the first attempt fails.
    ///
    /// The sequence is: query, then (on any failure or a missing socket) close,
    /// reconnect, query again. There is never a second reconnect within one
    /// call.
    pub async fn execute_with_reconnect(&mut self, sql: &str) -> Result<QueryOutcome> {
        let first_error = match self.socket.as_mut() {
            Some(socket) => match socket.query(sql).await {
                Ok(sets) => {
                    self.state = ConnectionState::Connected;
                    self.last_status = OperationStatus::Success;
                    return Ok(QueryOutcome::new(sets, false));
                }
                Err(e) => e.to_string(),
            },
            None => "no open socket".to_string(),
        };

        tracing::warn!(
            database = %self.settings.database,
            error = %first_error,
            "query failed, reconnecting"
        );
        self.last_status = OperationStatus::Failure;

        self.reconnect().await?;

        let retried = match self.socket.as_mut() {
            Some(socket) => socket.query(sql).await,
            None => Err(SqlgateError::Connection("no open socket".into())),
        };

        match retried {
            Ok(sets) => {
                self.last_status = OperationStatus::Success;
                tracing::info!(
                    database = %self.settings.database,
                    "query succeeded after reconnect"
                );
                Ok(QueryOutcome::new(sets, true))
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                tracing::warn!(
                    database = %self.settings.database,
                    error = %e,
                    "query failed again after reconnect"
                );
                Err(SqlgateError::RetryFailed {
                    database: self.settings.database.clone(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Replace the socket with a fresh one
    async fn reconnect(&mut self) -> Result<()> {
        self.state = ConnectionState::Reconnecting;
        self.reconnects += 1;
        self.close_socket().await;

        match self.driver.connect(&self.settings).await {
            Ok(socket) => {
                tracing::debug!(
                    database = %self.settings.database,
                    connection_id = ?socket.connection_id(),
                    "reconnected"
                );
                self.socket = Some(socket);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                tracing::warn!(
                    database = %self.settings.database,
                    error = %e,
                    "reconnect failed"
                );
                Err(SqlgateError::Reconnect {
                    database: self.settings.database.clone(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Close the socket if one is open. Returns whether a socket was closed.
    pub async fn close(&mut self) -> bool {
        let had_socket = self.socket.is_some();
        self.close_socket().await;
        self.state = ConnectionState::Failed;
        had_socket
    }

    async fn close_socket(&mut self) {
        let Some(mut socket) = self.socket.take() else {
            return;
        };
        // A dead peer must not stall the caller past the configured timeout.
        match tokio::time::timeout(self.settings.timeout(), socket.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "error while closing socket"),
            Err(_) => tracing::debug!("closing socket timed out"),
        }
    }

    /// Close the socket from a synchronous context such as `Drop`.
    ///
    /// Inside a runtime the close runs as a task on it. Outside one (a plain
    /// thread, possibly after the pool's runtime has shut down) it runs to
    /// completion on a short-lived current-thread runtime.
    pub(crate) fn close_detached(mut self) {
        let Some(mut socket) = self.socket.take() else {
            return;
        };
        let limit = self.settings.timeout();
        let close = async move {
            match tokio::time::timeout(limit, socket.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "error while closing socket"),
                Err(_) => tracing::debug!("closing socket timed out"),
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close);
            }
            Err(_) => match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(close),
                Err(e) => tracing::warn!(error = %e, "no runtime available to close socket"),
            },
        }
    }
}

impl std::fmt::Debug for ManagedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("database", &self.settings.database)
            .field("connection_id", &self.connection_id())
            .field("state", &self.state)
            .field("last_status", &self.last_status)
            .field("reconnects", &self.reconnects)
            .finish()
    }
}
