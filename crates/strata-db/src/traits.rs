//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use std::fmt;

/// A single bound parameter or column value.
///
/// Deliberately small: the tracking table only stores text and timestamps
/// (bound as text), and migrations carry their own SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    Int(i64),
}

/// One result row, columns in select-list order.
pub type SqlRow = Vec<SqlValue>;

impl SqlValue {
    /// Borrow the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "null"),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Database abstraction trait for Strata
///
/// Implementations must be Send + Sync for async operation. Calls are
/// awaited one at a time by the migration engine; an implementation never
/// sees two statements of the same run interleaved.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a single statement with positional `?` parameters
    async fn execute_with_params(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query with positional `?` parameters and collect every row
    async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Drop a table or view if it exists
    async fn drop_if_exists(&self, name: &str) -> DbResult<()>;

    /// Create a schema if it does not exist
    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;
}
