mod sqlite;

use serde::Serialize;

#[cfg(test)]
use mockall::automock;

use crate::{error::Result, row::DepthRow};
pub use sqlite::SqliteRowStore;

/// Outcome of one batch write.
#[derive(Debug, Default, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct InsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Depth-keyed storage of resampled rows.
///
/// Every batch write is all-or-nothing: a concurrent reader sees either the
/// rows from before the call or the rows after it.
#[cfg_attr(test, automock)]
pub trait RowStore: Send + 'static {
    /// Upsert keyed by depth. Writing the same batch twice leaves the stored rows
    /// unchanged, only their `updated_at` is refreshed.
    fn insert_many(&mut self, rows: &[DepthRow]) -> Result<InsertSummary>;

    /// Drop every stored row and write `rows` in the same transaction.
    fn replace_all(&mut self, rows: &[DepthRow]) -> Result<InsertSummary>;

    /// Rows with `min <= depth <= max`, ascending by depth.
    fn find_by_depth_range(&self, min: f64, max: f64) -> Result<Vec<DepthRow>>;

    /// Returns the number of removed rows.
    fn clear(&mut self) -> Result<usize>;

    fn count(&self) -> Result<usize>;
}
