//! Query-related data models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default cap on rows returned by a read query.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Rows returned by a read-only statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in the order the database returned them.
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// Set when more rows were available than the configured cap.
    pub truncated: bool,
}

impl QueryResult {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<serde_json::Map<String, JsonValue>>,
        truncated: bool,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            truncated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of a mutating statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    /// Only reported by backends that track it, and only when non-zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<u64>,
}

impl ExecuteResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: u64) -> Self {
        self.last_insert_id = (id != 0).then_some(id);
        self
    }
}
