//! MySQL driver implementation

use async_trait::async_trait;
use sqlgate_core::{Connection, ConnectionSettings, DatabaseDriver, Result};

use crate::MySqlConnection;

/// MySQL database driver
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create a new MySQL driver instance
    pub fn new() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn default_port(&self) -> Option<u16> {
        Some(3306)
    }

    #[tracing::instrument(skip(self, settings), fields(host = %settings.host, database = %settings.database))]
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn Connection>> {
        let conn = MySqlConnection::connect(settings).await.inspect_err(|e| {
            tracing::debug!(error = %e, "failed to connect to MySQL database");
        })?;
        Ok(Box::new(conn))
    }
}
