//! `sqlgate bench`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use serde::Serialize;
use sqlgate_connection::{ConnectionPool, PoolStats};
use sqlgate_core::SqlgateError;

#[derive(Debug, Clone, Args)]
pub struct BenchArgs {
    /// Number of concurrent workers
    #[arg(long, default_value_t = 8)]
    pub workers: usize,

    /// Fetch/execute/recycle rounds per worker
    #[arg(long, default_value_t = 100)]
    pub iterations: usize,

    /// Statement each round executes
    #[arg(long, default_value = "SELECT 1")]
    pub query: String,

    /// Print the summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Default)]
struct Counters {
    successes: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    reconnects: AtomicU64,
}

/// What a bench run observed
#[derive(Debug, Clone, Serialize)]
pub struct BenchSummary {
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub reconnects: u64,
    pub elapsed_ms: u64,
    pub pool: PoolStats,
}

impl BenchSummary {
    pub fn throughput(&self) -> f64 {
        if self.elapsed_ms == 0 {
            0.0
        } else {
            self.successes as f64 * 1000.0 / self.elapsed_ms as f64
        }
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
        table.add_row(vec!["successes".to_string(), self.successes.to_string()]);
        table.add_row(vec!["failures".to_string(), self.failures.to_string()]);
        table.add_row(vec!["fetch timeouts".to_string(), self.timeouts.to_string()]);
        table.add_row(vec!["reconnects".to_string(), self.reconnects.to_string()]);
        table.add_row(vec!["elapsed".to_string(), format!("{} ms", self.elapsed_ms)]);
        table.add_row(vec!["throughput".to_string(), format!("{:.1} q/s", self.throughput())]);
        table.add_row(vec!["pool capacity".to_string(), self.pool.capacity.to_string()]);
        table.add_row(vec!["pool available".to_string(), self.pool.available.to_string()]);
        table
    }
}

/// Run the workload and collect counts
pub async fn run_workload(pool: &ConnectionPool, args: &BenchArgs) -> BenchSummary {
    let counters = Arc::new(Counters::default());
    let started = Instant::now();

    let mut workers = Vec::with_capacity(args.workers);
    for worker in 0..args.workers {
        let pool = pool.clone();
        let counters = counters.clone();
        let query = args.query.clone();
        let iterations = args.iterations;
        workers.push(tokio::spawn(async move {
            for _ in 0..iterations {
                let mut lease = match pool.fetch().await {
                    Ok(lease) => lease,
                    Err(SqlgateError::PoolClosed) => break,
                    Err(e) if e.is_retriable() => {
                        counters.timeouts.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(worker, error = %e, "fetch failed");
                        counters.failures.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                };

                match pool.execute(&mut lease, &query).await {
                    Ok(outcome) => {
                        counters.successes.fetch_add(1, Ordering::Relaxed);
                        if outcome.reconnected() {
                            counters.reconnects.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(_) => {
                        counters.failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
                pool.recycle(lease);
            }
        }));
    }

    for handle in workers {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "bench worker panicked");
        }
    }

    BenchSummary {
        successes: counters.successes.load(Ordering::Relaxed),
        failures: counters.failures.load(Ordering::Relaxed),
        timeouts: counters.timeouts.load(Ordering::Relaxed),
        reconnects: counters.reconnects.load(Ordering::Relaxed),
        elapsed_ms: duration_ms(started.elapsed()),
        pool: pool.stats(),
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

pub async fn run(pool: &ConnectionPool, args: &BenchArgs) -> anyhow::Result<()> {
    tracing::info!(
        workers = args.workers,
        iterations = args.iterations,
        capacity = pool.capacity(),
        "starting bench"
    );

    let summary = run_workload(pool, args).await;
    pool.log_stats();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.to_table());
    }
    Ok(())
}
