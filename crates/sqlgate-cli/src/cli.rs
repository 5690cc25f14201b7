//! `sqlgate` - exercise a bounded MySQL connection pool from the command line

mod bench;
mod logging;
mod query;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use sqlgate_connection::{ConnectionPool, PoolConfig};
use sqlgate_core::{ConnectionSettings, SettingsFile};
use sqlgate_driver_mysql::MySqlDriver;

#[derive(Debug, Parser)]
#[command(name = "sqlgate", version, about = "Exercise a bounded MySQL connection pool")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Directory for JSON log files
    #[arg(long, env = "SQLGATE_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// Also write JSON logs to the log directory
    #[arg(long, env = "SQLGATE_JSON_LOGS", global = true)]
    json_logs: bool,

    /// Log pool internals at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Hammer the pool with concurrent fetch/execute/recycle loops
    Bench(bench::BenchArgs),
    /// Run one statement and print every result set
    Query(query::QueryArgs),
}

/// Where to connect; flags override values read from `--config`
#[derive(Debug, Clone, Default, Args)]
struct ConnectionArgs {
    /// TOML settings file with one table per section
    #[arg(long, env = "SQLGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Section of the settings file to use
    #[arg(long, env = "SQLGATE_SECTION", default_value = "default", global = true)]
    section: String,

    #[arg(long, env = "SQLGATE_HOST", global = true)]
    host: Option<String>,

    #[arg(long, env = "SQLGATE_PORT", global = true)]
    port: Option<u16>,

    #[arg(long, env = "SQLGATE_USER", global = true)]
    user: Option<String>,

    #[arg(long, env = "SQLGATE_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    #[arg(long, env = "SQLGATE_DATABASE", global = true)]
    database: Option<String>,

    #[arg(long, env = "SQLGATE_CHARSET", global = true)]
    charset: Option<String>,

    /// Connect timeout in seconds
    #[arg(long, env = "SQLGATE_TIMEOUT", global = true)]
    timeout: Option<u64>,

    /// Limit in seconds for one whole statement; 0 disables it
    #[arg(long, env = "SQLGATE_READ_TIMEOUT", global = true)]
    read_timeout: Option<u64>,

    /// Requested pool size; zero or negative means the maximum
    #[arg(long, env = "SQLGATE_POOL_SIZE", allow_negative_numbers = true, global = true)]
    pool_size: Option<i64>,

    /// How long a fetch waits for a free connection
    #[arg(long, env = "SQLGATE_FETCH_TIMEOUT_MS", default_value_t = 1000, global = true)]
    fetch_timeout_ms: u64,
}

impl ConnectionArgs {
    /// Merge the settings file section (if any) with flag overrides
    fn resolve(&self) -> anyhow::Result<(ConnectionSettings, PoolConfig)> {
        let (mut settings, mut pool_size) = match &self.config {
            Some(path) => {
                let file = SettingsFile::load(path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                let section = file
                    .section(&self.section)
                    .with_context(|| format!("invalid section '{}'", self.section))?;
                (section.settings.clone(), section.pool_size)
            }
            None => {
                let (Some(host), Some(user), Some(database)) =
                    (&self.host, &self.user, &self.database)
                else {
                    bail!("either --config or all of --host, --user and --database are required");
                };
                (
                    ConnectionSettings::new(
                        host,
                        user,
                        self.password.as_deref().unwrap_or_default(),
                        database,
                    ),
                    PoolConfig::default().requested_size(),
                )
            }
        };

        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(user) = &self.user {
            settings.user = user.clone();
        }
        if let Some(password) = &self.password {
            settings.password = password.clone();
        }
        if let Some(database) = &self.database {
            settings.database = database.clone();
        }
        if let Some(charset) = &self.charset {
            settings.charset = charset.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        if let Some(read_timeout) = self.read_timeout {
            settings.read_timeout_secs = Some(read_timeout);
        }
        if let Some(size) = self.pool_size {
            pool_size = size;
        }

        settings.validate()?;
        let config = PoolConfig::new(pool_size).with_fetch_timeout_ms(self.fetch_timeout_ms);
        Ok((settings, config))
    }
}

async fn open_pool(connection: &ConnectionArgs) -> anyhow::Result<ConnectionPool> {
    let (settings, config) = connection.resolve()?;
    let target = format!("{}:{}/{}", settings.host, settings.port, settings.database);
    ConnectionPool::open(Arc::new(MySqlDriver::new()), settings, config)
        .await
        .with_context(|| format!("failed to open connection pool to {}", target))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        logging::LoggingConfig::verbose()
    } else {
        logging::LoggingConfig::default()
    };
    log_config.enable_json_logs = cli.json_logs;
    if let Some(dir) = &cli.log_dir {
        log_config.log_dir = dir.clone();
    }
    let _log_guard = logging::init(&log_config)?;

    let pool = open_pool(&cli.connection).await?;
    let result = match &cli.command {
        Command::Bench(args) => bench::run(&pool, args).await,
        Command::Query(args) => query::run(&pool, args).await,
    };
    pool.close().await;
    result
}
