//! `sqlgate query`

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use sqlgate_connection::ConnectionPool;
use sqlgate_core::QueryResult;

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Statement to run; several statements separated by `;` are allowed
    pub sql: String,
}

/// Render one result set; statements without columns report affected rows
fn render_result(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return format!("{} row(s) affected", result.affected_rows);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(result.columns.iter().map(|c| c.name.clone()));
    for row in &result.rows {
        table.add_row(row.values.iter().map(|v| v.to_string()));
    }
    format!("{}\n{} row(s)", table, result.row_count())
}

pub async fn run(pool: &ConnectionPool, args: &QueryArgs) -> anyhow::Result<()> {
    let mut lease = pool.fetch().await?;
    let outcome = pool.execute(&mut lease, &args.sql).await;
    pool.recycle(lease);
    let outcome = outcome?;

    if outcome.reconnected() {
        tracing::info!("connection was re-established before the query succeeded");
    }
    for (index, result) in outcome.result_sets().iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("{}", render_result(result));
    }
    Ok(())
}
