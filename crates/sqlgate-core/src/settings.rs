//! Connection settings shared by every pooled connection
//!
//! Settings are built once, validated, and then shared read-only (behind an
//! `Arc`) by every connection the pool opens or reopens.
//!
//! # Example
//!
//! ```
//! use sqlgate_core::ConnectionSettings;
//!
//! let settings = ConnectionSettings::new("db.internal", "app", "secret", "orders")
//!     .with_port(3307)
//!     .with_timeout_secs(5);
//! assert!(settings.validate().is_ok());
//! assert!(!format!("{:?}", settings).contains("secret"));
//! ```

mod file;

#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::Deserialize;

use crate::{Result, SqlgateError};

pub use file::{SettingsFile, SettingsSection};

/// Default server port
pub const DEFAULT_PORT: u16 = 3306;
/// Default connect timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;
/// Default connection character set
pub const DEFAULT_CHARSET: &str = "utf8mb4";

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

/// How to reach the database
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionSettings {
    /// Server host name or address
    #[serde(alias = "HOST")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,

    /// Login user
    #[serde(alias = "USER")]
    pub user: String,

    /// Login password, never logged
    #[serde(alias = "PASSWORD")]
    pub password: String,

    /// Default database selected on connect
    #[serde(alias = "DATABASE")]
    pub database: String,

    /// Character set applied on every (re)connect
    #[serde(default = "default_charset", alias = "CHARSET")]
    pub charset: String,

    /// Connect timeout in seconds; also the statement timeout unless
    /// `read_timeout_secs` is set
    #[serde(default = "default_timeout_secs", alias = "timeout", alias = "TIMEOUT")]
    pub timeout_secs: u64,

    /// Upper bound in seconds for one whole statement, all of its result sets
    /// included; 0 disables it. This is not a per-read socket timeout, so a
    /// statement that legitimately runs longer fails and costs a reconnect.
    #[serde(default, alias = "read_timeout", alias = "READ_TIMEOUT")]
    pub read_timeout_secs: Option<u64>,
}

impl ConnectionSettings {
    /// Create settings with the default port, charset and timeout
    pub fn new(host: &str, user: &str, password: &str, database: &str) -> Self {
        Self {
            host: host.to_string(),
            port: DEFAULT_PORT,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            charset: default_charset(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            read_timeout_secs: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_charset(mut self, charset: &str) -> Self {
        self.charset = charset.to_string();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_read_timeout_secs(mut self, read_timeout_secs: u64) -> Self {
        self.read_timeout_secs = Some(read_timeout_secs);
        self
    }

    /// Connect timeout as a Duration (at least one second)
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Statement timeout, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(self.timeout()),
        }
    }

    /// Reject settings that cannot possibly reach a server.
    ///
    /// Host, user and database must be non-blank. The password may be empty
    /// (passwordless accounts exist) but is always present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("host", &self.host),
            ("user", &self.user),
            ("database", &self.database),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SqlgateError::Configuration(format!(
                    "connection setting '{}' must not be empty",
                    field
                )));
            }
        }
        if self.charset.trim().is_empty() {
            return Err(SqlgateError::Configuration(
                "connection setting 'charset' must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("timeout_secs", &self.timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .finish()
    }
}
