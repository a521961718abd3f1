use crate::{Result, Value};
use std::sync::Arc;

/// Outcome of a statement that does not return rows.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    pub rows_affected: u64,
    /// Key generated by the last INSERT, when the engine reports one.
    pub last_affected_id: Option<i64>,
}

/// Row with the labels of its columns, labels are shared by every row of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    pub labels: Arc<[String]>,
    pub values: Box<[Value]>,
}

impl RowLabeled {
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
}

/// Rows produced by [`Connection::fetch`], borrowing the connection.
pub type RowCursor<'c> = Box<dyn Iterator<Item = Result<RowLabeled>> + 'c>;

/// Physical connection to a database.
///
/// Calls block the current thread, a connection is used by one task at a time.
pub trait Connection: Send + 'static {
    /// Runs one or more statements discarding any row.
    fn execute(&mut self, sql: &str) -> Result<RowsAffected>;

    /// Runs a query and returns its rows, values are reported in their stored form.
    fn fetch<'s>(&'s mut self, sql: &str) -> Result<RowCursor<'s>>;

    fn is_closed(&self) -> bool;

    fn in_transaction(&self) -> bool;

    fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN").map(|_| ())
    }

    fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").map(|_| ())
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").map(|_| ())
    }
}
