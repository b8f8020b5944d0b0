//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, SqlRow, SqlValue};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, duckdb::params_from_iter(to_duckdb_values(params)))
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(DbError::from)
    }

    /// Collect all rows of a query synchronously
    ///
    /// DuckDB 1.4 panics on `stmt.column_count()` before execution, so the
    /// column count is read from each row instead.
    fn query_rows_sync(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(duckdb::params_from_iter(to_duckdb_values(params)), |row| {
                let col_count = row.as_ref().column_count();
                Ok((0..col_count).map(|i| read_column(row, i)).collect())
            })?
            .collect::<Result<Vec<SqlRow>, _>>()?;
        Ok(rows)
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified_name(name);
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;

        Ok(count > 0)
    }
}

/// Split `schema.table` into its parts, defaulting the schema to `main`.
fn split_qualified_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("main", name),
    }
}

fn to_duckdb_values(params: &[SqlValue]) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p {
            SqlValue::Null => Value::Null,
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Int(n) => Value::BigInt(*n),
        })
        .collect()
}

/// Read a column, trying text first and then integer types.
///
/// Anything else that is not NULL is rendered through its text form, which
/// callers avoid by casting in SQL (timestamps are selected as VARCHAR).
fn read_column(row: &duckdb::Row<'_>, idx: usize) -> SqlValue {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return SqlValue::Text(s);
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return SqlValue::Int(n);
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return SqlValue::Text(f.to_string());
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return SqlValue::Text(b.to_string());
    }
    SqlValue::Null
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute_with_params(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        self.execute_sync(sql, params)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<SqlRow>> {
        self.query_rows_sync(sql, params)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        // Views and tables share a namespace; only one of these can match.
        let _ = self.execute_sync(&format!("DROP VIEW IF EXISTS {}", name), &[]);
        self.execute_sync(&format!("DROP TABLE IF EXISTS {}", name), &[])?;
        log::debug!("Dropped relation {name} (if it existed)");
        Ok(())
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", schema);
        self.execute_sync(&sql, &[])?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
