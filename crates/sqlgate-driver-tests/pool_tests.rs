//! Connection pool tests against a real MySQL server
//!
//! Covers capacity enforcement, FIFO reuse, fetch timeouts, self-healing after
//! a server-side KILL, and rollback of a failed open.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sqlgate_connection::{BlockingPool, PoolConfig};
use sqlgate_core::{InitStage, SqlgateError, Value};

use crate::fixtures::{mysql_driver, mysql_settings, test_pool, test_pool_with};

const MISSING_TABLE_SQL: &str = "SELECT * FROM sqlgate_table_that_does_not_exist";

#[rstest]
#[case::single(1)]
#[case::pair(2)]
#[case::five(5)]
#[tokio::test]
async fn test_capacity_fetches_succeed_then_next_waits(#[case] capacity: usize) -> anyhow::Result<()> {
    let pool = test_pool_with(PoolConfig::new(capacity as i64).with_fetch_timeout_ms(200)).await?;

    let mut leases = Vec::new();
    for _ in 0..capacity {
        leases.push(pool.fetch().await.context("fetch within capacity")?);
    }
    assert!(matches!(pool.fetch().await, Err(SqlgateError::Timeout(_))));

    pool.recycle(leases.remove(0));
    let lease = pool.fetch().await.context("fetch after recycle")?;
    assert!(lease.connection_id().is_some());

    drop(lease);
    drop(leases);
    assert_eq!(pool.close().await, capacity);
    Ok(())
}

#[tokio::test]
async fn test_round_trip_restores_same_connection() -> anyhow::Result<()> {
    let pool = test_pool(1).await?;

    let lease = pool.fetch().await?;
    let id = lease.connection_id();
    pool.recycle(lease);

    let stats = pool.stats();
    assert_eq!(stats.available, 1);
    assert_eq!(stats.leased, 0);

    let mut lease = pool.fetch().await?;
    assert_eq!(lease.connection_id(), id);

    let outcome = pool.execute(&mut lease, "SELECT CONNECTION_ID() AS id").await?;
    let server_id = outcome
        .first()
        .and_then(|r| r.rows.first())
        .and_then(|row| row.get_by_name("id"))
        .and_then(Value::as_i64);
    assert_eq!(server_id.map(|v| v as u64), id);

    pool.recycle(lease);
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_failing_query_reconnects_once_per_call() -> anyhow::Result<()> {
    let pool = test_pool(1).await?;
    let mut lease = pool.fetch().await?;

    for call in 1..=3u64 {
        let before = lease.connection_id();
        let err = pool
            .execute(&mut lease, MISSING_TABLE_SQL)
            .await
            .expect_err("query on a missing table must fail");
        assert!(matches!(err, SqlgateError::RetryFailed { ref database, .. } if database == "test"));
        assert_eq!(pool.stats().reconnects, call);
        assert_ne!(lease.connection_id(), before);
    }

    // the healed connection still works
    let outcome = pool.execute(&mut lease, "SELECT 1").await?;
    assert!(!outcome.reconnected());

    pool.recycle(lease);
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_killed_connection_heals_on_execute() -> anyhow::Result<()> {
    let pool = test_pool(2).await?;
    let mut victim = pool.fetch().await?;
    let mut killer = pool.fetch().await?;

    let victim_id = victim.connection_id().context("victim has no connection id")?;
    pool.execute(&mut killer, &format!("KILL {}", victim_id)).await?;

    let outcome = pool.execute(&mut victim, "SELECT 1 AS one").await?;
    assert!(outcome.reconnected());
    assert_ne!(victim.connection_id(), Some(victim_id));
    assert_eq!(
        outcome.first().and_then(|r| r.rows[0].get(0)).and_then(Value::as_i64),
        Some(1)
    );
    assert_eq!(pool.stats().reconnects, 1);

    pool.recycle(victim);
    pool.recycle(killer);
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_blocked_fetch_returns_after_recycle() -> anyhow::Result<()> {
    let pool = test_pool_with(PoolConfig::new(2).with_fetch_timeout_ms(5_000)).await?;
    let first = pool.fetch().await?;
    let _second = pool.fetch().await?;

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.fetch().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiter.is_finished());

    pool.recycle(first);
    let mut lease = waiter.await??;
    pool.execute(&mut lease, "SELECT 1").await?;

    drop(lease);
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_fetch_timeout_is_bounded() -> anyhow::Result<()> {
    let pool = test_pool(1).await?;
    let _held = pool.fetch().await?;

    let start = Instant::now();
    let err = pool.fetch().await.expect_err("pool is exhausted");
    let elapsed = start.elapsed();

    assert!(matches!(err, SqlgateError::Timeout(_)));
    assert!(elapsed >= Duration::from_millis(1000), "returned early: {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(1050), "returned late: {:?}", elapsed);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workers_stay_within_capacity() -> anyhow::Result<()> {
    const CAPACITY: usize = 3;
    let pool = test_pool_with(PoolConfig::new(CAPACITY as i64).with_fetch_timeout_ms(30_000)).await?;

    let in_use = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let in_use = in_use.clone();
        let max_seen = max_seen.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..10 {
                let mut lease = pool.fetch().await?;
                let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                pool.execute(&mut lease, "SELECT SLEEP(0.01)").await?;
                in_use.fetch_sub(1, Ordering::SeqCst);
                pool.recycle(lease);
            }
            Ok::<(), SqlgateError>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert!(max_seen.load(Ordering::SeqCst) <= CAPACITY);
    assert_eq!(pool.stats().available, CAPACITY);
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_open_with_bad_password_fails_at_connect() -> anyhow::Result<()> {
    let mut settings = mysql_settings().await?;
    settings.password = "definitely-wrong".into();

    let err = sqlgate_connection::ConnectionPool::open(mysql_driver(), settings, PoolConfig::new(2))
        .await
        .expect_err("authentication must fail");
    assert!(matches!(
        err,
        SqlgateError::Initialization {
            slot: 0,
            stage: InitStage::Connect,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_open_with_bad_charset_fails_at_driver() -> anyhow::Result<()> {
    let settings = mysql_settings().await?.with_charset("utf8;DROP");

    let err = sqlgate_connection::ConnectionPool::open(mysql_driver(), settings, PoolConfig::new(2))
        .await
        .expect_err("charset must be rejected");
    assert!(matches!(
        err,
        SqlgateError::Initialization {
            stage: InitStage::Driver,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_close_then_fetch_reports_pool_closed() -> anyhow::Result<()> {
    let pool = test_pool(2).await?;
    let outstanding = pool.fetch().await?;

    assert_eq!(pool.close().await, 1);
    assert!(matches!(pool.fetch().await, Err(SqlgateError::PoolClosed)));

    drop(outstanding);
    assert_eq!(pool.stats().available, 0);
    Ok(())
}

#[test]
fn test_blocking_pool_from_os_threads() -> anyhow::Result<()> {
    let settings = tokio::runtime::Runtime::new()?.block_on(mysql_settings())?;
    let pool = Arc::new(BlockingPool::open(
        mysql_driver(),
        settings,
        PoolConfig::new(2).with_fetch_timeout_ms(30_000),
    )?);

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            std::thread::spawn(move || -> sqlgate_core::Result<()> {
                for _ in 0..5 {
                    let mut lease = pool.fetch()?;
                    pool.execute(&mut lease, "SELECT 1")?;
                    pool.recycle(lease);
                }
                Ok(())
            })
        })
        .collect();
    for thread in threads {
        thread
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))??;
    }

    assert_eq!(pool.stats().available, 2);
    assert_eq!(pool.close(), 2);
    Ok(())
}
