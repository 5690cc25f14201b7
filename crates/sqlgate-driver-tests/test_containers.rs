//! Docker container management for integration tests.
//!
//! The MySQL container is started lazily by the first test that needs it and
//! reused by every later test in the same process. testcontainers removes it
//! when the process exits.

use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::mysql::Mysql;
use tokio::sync::OnceCell;

/// Information about a running test container
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Host address (typically 127.0.0.1)
    pub host: String,
    /// Port number (randomly assigned by testcontainers)
    pub port: u16,
    /// Database name
    pub database: String,
    /// Username for authentication
    pub username: String,
    /// Password for authentication (may be empty)
    pub password: String,
}

struct MysqlContainer {
    // Kept alive for the whole test process
    #[allow(dead_code)]
    inner: std::sync::Mutex<ContainerAsync<Mysql>>,
    info: ContainerInfo,
}

/// Global MySQL container instance
static MYSQL_CONTAINER: OnceCell<MysqlContainer> = OnceCell::const_new();

async fn start_mysql() -> anyhow::Result<MysqlContainer> {
    tracing::info!("starting MySQL test container");

    let container = Mysql::default()
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start mysql container: {}", e))?;

    let host_port = container
        .get_host_port_ipv4(3306)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get mysql port: {}", e))?;

    // testcontainers-modules MySQL defaults: root user with empty password and "test" database
    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port: host_port,
        database: "test".to_string(),
        username: "root".to_string(),
        password: String::new(),
    };

    tracing::info!(port = host_port, "MySQL test container started");
    Ok(MysqlContainer {
        inner: std::sync::Mutex::new(container),
        info,
    })
}

/// Get or create the MySQL test container
pub async fn mysql_container() -> anyhow::Result<ContainerInfo> {
    let container = MYSQL_CONTAINER.get_or_try_init(start_mysql).await?;
    Ok(container.info.clone())
}
