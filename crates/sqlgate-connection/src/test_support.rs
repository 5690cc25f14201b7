//! Mock driver shared by the unit tests

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlgate_core::{
    Connection, ConnectionSettings, DatabaseDriver, QueryResult, Result, SqlgateError, Value,
};

/// Statements containing this marker always fail
pub const FAILING_SQL: &str = "SELECT broken";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn settings() -> ConnectionSettings {
    ConnectionSettings::new("localhost", "tester", "secret", "testdb").with_timeout_secs(1)
}

#[derive(Default)]
struct Shared {
    next_id: AtomicU64,
    connects: AtomicUsize,
    closes: AtomicUsize,
    queries: AtomicUsize,
    killed: Mutex<HashSet<u64>>,
    refuse_connects: AtomicBool,
}

/// Driver whose connections count what happens to them
#[derive(Clone, Default)]
pub struct MockDriver {
    shared: Arc<Shared>,
    /// Fail the connect with this zero-based index (counted over the driver's lifetime)
    fail_at: Option<(usize, fn() -> SqlgateError)>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize, error: fn() -> SqlgateError) -> Self {
        Self {
            fail_at: Some((index, error)),
            ..Self::default()
        }
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.shared.queries.load(Ordering::SeqCst)
    }

    /// Break an open connection as if the server had dropped it
    pub fn kill(&self, connection_id: u64) {
        self.shared.killed.lock().insert(connection_id);
    }

    /// Make every later connect fail
    pub fn refuse_connects(&self, refuse: bool) {
        self.shared.refuse_connects.store(refuse, Ordering::SeqCst);
    }

    pub fn as_driver(&self) -> Arc<dyn DatabaseDriver> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, _settings: &ConnectionSettings) -> Result<Box<dyn Connection>> {
        let index = self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if let Some((fail_index, error)) = self.fail_at {
            if index == fail_index {
                return Err(error());
            }
        }
        if self.shared.refuse_connects.load(Ordering::SeqCst) {
            return Err(SqlgateError::Connection("connection refused".into()));
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockConnection {
            id,
            shared: self.shared.clone(),
            closed: false,
        }))
    }
}

struct MockConnection {
    id: u64,
    shared: Arc<Shared>,
    closed: bool,
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    fn connection_id(&self) -> Option<u64> {
        Some(self.id)
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<QueryResult>> {
        self.shared.queries.fetch_add(1, Ordering::SeqCst);
        if self.closed || self.shared.killed.lock().contains(&self.id) {
            return Err(SqlgateError::Query("server has gone away".into()));
        }
        if sql.contains(FAILING_SQL) {
            return Err(SqlgateError::Query("syntax error".into()));
        }
        Ok(vec![QueryResult::from_rows(
            vec!["connection_id".into()],
            vec![vec![Value::Int64(self.id as i64)]],
        )])
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
