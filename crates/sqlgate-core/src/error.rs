//! Error types for sqlgate

use thiserror::Error;

/// Step of pool initialization that failed while opening a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    /// Building driver state or connect options (bad charset, unusable settings)
    Driver,
    /// Establishing the socket to the server
    Connect,
}

impl std::fmt::Display for InitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitStage::Driver => write!(f, "driver initialization"),
            InitStage::Connect => write!(f, "socket connect"),
        }
    }
}

/// Core error type for sqlgate operations
#[derive(Error, Debug)]
pub enum SqlgateError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Initialization of slot {slot} failed during {stage}: {message}")]
    Initialization {
        slot: usize,
        stage: InitStage,
        message: String,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Reconnect to database {database} failed: {message}")]
    Reconnect { database: String, message: String },

    #[error("Query on database {database} failed again after reconnect: {message}")]
    RetryFailed { database: String, message: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] toml::de::Error),
}

impl SqlgateError {
    /// Whether the caller may simply try the same call again later.
    ///
    /// Only pool exhaustion is retriable; everything else needs a change in
    /// configuration or server state first.
    pub fn is_retriable(&self) -> bool {
        matches!(self, SqlgateError::Timeout(_))
    }

    /// Initialization stage this error maps to when it happens while opening a slot.
    pub fn init_stage(&self) -> InitStage {
        match self {
            SqlgateError::Driver(_) | SqlgateError::Configuration(_) => InitStage::Driver,
            _ => InitStage::Connect,
        }
    }
}

/// Result type alias for sqlgate operations
pub type Result<T> = std::result::Result<T, SqlgateError>;
