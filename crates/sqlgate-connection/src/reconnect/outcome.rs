//! Result of one `execute` call

use sqlgate_core::QueryResult;

/// Every result set a statement produced, plus whether the connection had to
/// be re-established to get them
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    result_sets: Vec<QueryResult>,
    reconnected: bool,
}

impl QueryOutcome {
    pub fn new(result_sets: Vec<QueryResult>, reconnected: bool) -> Self {
        Self {
            result_sets,
            reconnected,
        }
    }

    /// All result sets in the order the server produced them
    pub fn result_sets(&self) -> &[QueryResult] {
        &self.result_sets
    }

    /// The first result set, if the statement produced any
    pub fn first(&self) -> Option<&QueryResult> {
        self.result_sets.first()
    }

    pub fn into_result_sets(self) -> Vec<QueryResult> {
        self.result_sets
    }

    /// Whether a reconnect happened before the query succeeded
    pub fn reconnected(&self) -> bool {
        self.reconnected
    }

    /// Total rows across every result set
    pub fn total_rows(&self) -> usize {
        self.result_sets.iter().map(|r| r.row_count()).sum()
    }

    /// Total affected rows across every result set
    pub fn affected_rows(&self) -> u64 {
        self.result_sets.iter().map(|r| r.affected_rows).sum()
    }
}
