//! Shared fixtures for the integration tests.
//!
//! Settings come from the testcontainers MySQL instance unless
//! `SQLGATE_TEST_MANUAL_CONTAINERS=1` is set, in which case they are read from
//! `SQLGATE_TEST_MYSQL_*` environment variables.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sqlgate_driver_tests::fixtures::test_pool;
//!
//! #[tokio::test]
//! async fn test_select_one() {
//!     let pool = test_pool(2).await.unwrap();
//!     let mut lease = pool.fetch().await.unwrap();
//!     pool.execute(&mut lease, "SELECT 1").await.unwrap();
//! }
//! ```

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlgate_connection::{ConnectionPool, PoolConfig};
use sqlgate_core::{ConnectionSettings, DatabaseDriver};
use sqlgate_driver_mysql::MySqlDriver;

use crate::test_containers::mysql_container;

/// Check if tests should use a manually managed server instead of testcontainers
///
/// Set SQLGATE_TEST_MANUAL_CONTAINERS=1 to use an already running server.
fn use_manual_containers() -> bool {
    env::var("SQLGATE_TEST_MANUAL_CONTAINERS")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(false)
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Settings for the test server
pub async fn mysql_settings() -> Result<ConnectionSettings> {
    initialize_logging();

    if use_manual_containers() {
        let port = env_or("SQLGATE_TEST_MYSQL_PORT", "3306")
            .parse::<u16>()
            .context("SQLGATE_TEST_MYSQL_PORT is not a port number")?;
        return Ok(ConnectionSettings::new(
            &env_or("SQLGATE_TEST_MYSQL_HOST", "127.0.0.1"),
            &env_or("SQLGATE_TEST_MYSQL_USER", "root"),
            &env_or("SQLGATE_TEST_MYSQL_PASSWORD", ""),
            &env_or("SQLGATE_TEST_MYSQL_DATABASE", "test"),
        )
        .with_port(port));
    }

    let info = mysql_container()
        .await
        .context("failed to start MySQL test container")?;
    Ok(
        ConnectionSettings::new(&info.host, &info.username, &info.password, &info.database)
            .with_port(info.port)
            .with_timeout_secs(5),
    )
}

/// The driver under test
pub fn mysql_driver() -> Arc<dyn DatabaseDriver> {
    Arc::new(MySqlDriver::new())
}

/// Open a pool against the test server
pub async fn test_pool_with(config: PoolConfig) -> Result<ConnectionPool> {
    let settings = mysql_settings().await?;
    ConnectionPool::open(mysql_driver(), settings, config)
        .await
        .context("failed to open test pool")
}

/// Open a pool of `size` connections with the default fetch timeout
pub async fn test_pool(size: i64) -> Result<ConnectionPool> {
    test_pool_with(PoolConfig::new(size)).await
}

/// Initialize logging for tests if not already initialized
fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlgate_connection=debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
