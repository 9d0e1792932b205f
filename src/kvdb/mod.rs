pub mod rocksdb;
pub mod schema;

use anyhow::Result;
use async_trait::async_trait;

/// One row of a wide-column table: its key and the column qualifiers present
/// on it. Hole scans only ever need presence, so values are stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: String,
    pub columns: Vec<String>,
}

impl Row {
    /// True when every qualifier in `required` is present on the row.
    pub fn has_all_columns(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|needed| self.columns.iter().any(|col| col == needed))
    }
}

/// Half-open key range `[start, end)`. An empty `end` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: String,
    pub end: String,
}

impl KeyRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Unbounded scan from `start` to the end of the table.
    pub fn infinite(start: impl Into<String>) -> Self {
        Self::new(start, "")
    }

    pub fn contains(&self, key: &str) -> bool {
        key >= self.start.as_str() && (self.end.is_empty() || key < self.end.as_str())
    }
}

/// Ordered row scans over a wide-column table.
///
/// Implementations must visit rows in ascending key order. The visitor
/// returns `false` to stop the scan early without error. `keys_only`
/// requests the stripped projection (keys and column presence, no values),
/// which is the only projection hole scans ever use.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn scan_rows(
        &self,
        range: &KeyRange,
        keys_only: bool,
        visit: &mut (dyn FnMut(Row) -> bool + Send),
    ) -> Result<()>;
}
