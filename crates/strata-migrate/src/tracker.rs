//! Tracking table and the persisted migration state machine.
//!
//! ```text
//!             begin                complete
//!  Pending ───────────▶ InProgress ──────────▶ Completed
//!     ▲                  │    ▲                    │
//!     │             fail │    │ retry              │
//!     │                  ▼    │                    │
//!     │                 Failed                     │
//!     │                                            │
//!     └────────────── remove (any state) ◀─────────┘
//!
//!  force_complete: any state ──▶ Completed, without running anything
//! ```
//!
//! Transitions are single conditional statements, so a wrong starting state
//! is detected by the affected row count rather than a separate read.

use crate::error::{MigrateError, MigrateResult};
use crate::state::{MigrationRecord, MigrationState, MigrationStatus};
use chrono::{DateTime, NaiveDateTime, Utc};
use strata_core::{validate_table_name, MigrationId, DEFAULT_TRACKING_TABLE};
use strata_db::{Database, SqlRow, SqlValue};

/// Format for binding `TIMESTAMP` parameters. DuckDB keeps microseconds.
const BIND_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format for reading `TIMESTAMP` columns cast to text.
const READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const SELECT_COLUMNS: &str = "id, status, CAST(started_at AS VARCHAR), \
     CAST(finished_at AS VARCHAR), checksum, failure_reason";

/// Owner of the tracking table.
///
/// All reads and writes of tracking state go through this type. It holds no
/// connection; every operation takes the database it should act on.
#[derive(Debug, Clone)]
pub struct VersionTracker {
    table_name: String,
}

impl Default for VersionTracker {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TRACKING_TABLE.to_string(),
        }
    }
}

impl VersionTracker {
    /// Tracker for the given table, which may be schema-qualified.
    pub fn new(table_name: impl Into<String>) -> MigrateResult<Self> {
        let table_name = table_name.into();
        validate_table_name(&table_name).map_err(MigrateError::Config)?;
        Ok(Self { table_name })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Whether the tracking table has been created.
    pub async fn exists(&self, db: &dyn Database) -> MigrateResult<bool> {
        Ok(db.relation_exists(&self.table_name).await?)
    }

    /// Create the tracking table (and its schema) if missing.
    pub async fn ensure_table(&self, db: &dyn Database) -> MigrateResult<()> {
        if let Some((schema, _)) = self.table_name.split_once('.') {
            db.create_schema_if_not_exists(schema).await?;
        }
        db.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                 id             VARCHAR PRIMARY KEY,
                 status         VARCHAR NOT NULL,
                 started_at     TIMESTAMP NOT NULL,
                 finished_at    TIMESTAMP,
                 checksum       VARCHAR,
                 failure_reason VARCHAR
             )",
            self.table_name
        ))
        .await?;
        Ok(())
    }

    /// Drop the tracking table, discarding all history, and recreate it empty.
    ///
    /// Only reachable through [`crate::RecoveryOperations::drop_and_recreate`],
    /// which enforces the confirmation gate.
    pub(crate) async fn drop_and_recreate(&self, db: &dyn Database) -> MigrateResult<()> {
        db.drop_if_exists(&self.table_name).await?;
        self.ensure_table(db).await?;
        log::warn!("Dropped and recreated tracking table {}", self.table_name);
        Ok(())
    }

    /// Fetch the record for `id`, if the migration was ever attempted.
    pub async fn get(&self, db: &dyn Database, id: &str) -> MigrateResult<Option<MigrationRecord>> {
        let rows = db
            .query_rows(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM {} WHERE id = ?",
                    self.table_name
                ),
                &[SqlValue::from(id)],
            )
            .await?;
        rows.first().map(parse_record).transpose()
    }

    /// Current state of `id`, `Pending` when no record exists.
    pub async fn state(&self, db: &dyn Database, id: &str) -> MigrateResult<MigrationState> {
        Ok(MigrationState::of(self.get(db, id).await?.as_ref()))
    }

    /// Every record, ordered by id.
    pub async fn list(&self, db: &dyn Database) -> MigrateResult<Vec<MigrationRecord>> {
        let rows = db
            .query_rows(
                &format!("SELECT {SELECT_COLUMNS} FROM {} ORDER BY id", self.table_name),
                &[],
            )
            .await?;
        rows.iter().map(parse_record).collect()
    }

    /// Every record, or none when the table has not been created yet.
    ///
    /// Used by read-only paths (dry runs, status) that must not create the
    /// table as a side effect.
    pub async fn list_if_exists(&self, db: &dyn Database) -> MigrateResult<Vec<MigrationRecord>> {
        if self.exists(db).await? {
            self.list(db).await
        } else {
            Ok(Vec::new())
        }
    }

    /// Completed records, most recently finished first.
    pub async fn completed_by_recency(
        &self,
        db: &dyn Database,
    ) -> MigrateResult<Vec<MigrationRecord>> {
        let rows = db
            .query_rows(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM {} WHERE status = ? \
                     ORDER BY finished_at DESC, id DESC",
                    self.table_name
                ),
                &[SqlValue::from(MigrationStatus::Completed.as_str())],
            )
            .await?;
        rows.iter().map(parse_record).collect()
    }

    /// Pending → InProgress.
    pub async fn begin(&self, db: &dyn Database, id: &MigrationId) -> MigrateResult<()> {
        if let Some(existing) = self.get(db, id).await? {
            return Err(MigrateError::InvalidState {
                id: id.clone(),
                state: existing.state(),
                operation: "begin",
            });
        }
        db.execute_with_params(
            &format!(
                "INSERT INTO {} (id, status, started_at) VALUES (?, ?, CAST(? AS TIMESTAMP))",
                self.table_name
            ),
            &[
                SqlValue::from(id.as_str()),
                SqlValue::from(MigrationStatus::InProgress.as_str()),
                now_param(),
            ],
        )
        .await?;
        log::debug!("{id}: pending -> in_progress");
        Ok(())
    }

    /// InProgress → Completed.
    pub async fn complete(
        &self,
        db: &dyn Database,
        id: &MigrationId,
        checksum: &str,
    ) -> MigrateResult<()> {
        let updated = db
            .execute_with_params(
                &format!(
                    "UPDATE {} SET status = ?, finished_at = CAST(? AS TIMESTAMP), checksum = ?, \
                     failure_reason = NULL WHERE id = ? AND status = ?",
                    self.table_name
                ),
                &[
                    SqlValue::from(MigrationStatus::Completed.as_str()),
                    now_param(),
                    SqlValue::from(checksum),
                    SqlValue::from(id.as_str()),
                    SqlValue::from(MigrationStatus::InProgress.as_str()),
                ],
            )
            .await?;
        self.expect_transition(db, id, updated, "complete").await?;
        log::debug!("{id}: in_progress -> completed");
        Ok(())
    }

    /// InProgress → Failed.
    pub async fn fail(&self, db: &dyn Database, id: &MigrationId, reason: &str) -> MigrateResult<()> {
        let updated = db
            .execute_with_params(
                &format!(
                    "UPDATE {} SET status = ?, finished_at = CAST(? AS TIMESTAMP), \
                     failure_reason = ? WHERE id = ? AND status = ?",
                    self.table_name
                ),
                &[
                    SqlValue::from(MigrationStatus::Failed.as_str()),
                    now_param(),
                    SqlValue::from(reason),
                    SqlValue::from(id.as_str()),
                    SqlValue::from(MigrationStatus::InProgress.as_str()),
                ],
            )
            .await?;
        self.expect_transition(db, id, updated, "fail").await?;
        log::debug!("{id}: in_progress -> failed");
        Ok(())
    }

    /// Failed → InProgress, clearing the previous failure.
    pub async fn retry(&self, db: &dyn Database, id: &MigrationId) -> MigrateResult<()> {
        let updated = db
            .execute_with_params(
                &format!(
                    "UPDATE {} SET status = ?, started_at = CAST(? AS TIMESTAMP), \
                     finished_at = NULL, failure_reason = NULL WHERE id = ? AND status = ?",
                    self.table_name
                ),
                &[
                    SqlValue::from(MigrationStatus::InProgress.as_str()),
                    now_param(),
                    SqlValue::from(id.as_str()),
                    SqlValue::from(MigrationStatus::Failed.as_str()),
                ],
            )
            .await?;
        self.expect_transition(db, id, updated, "retry").await?;
        log::debug!("{id}: failed -> in_progress");
        Ok(())
    }

    /// Any state → Completed without executing anything.
    ///
    /// With `checksum` of `None` an existing record keeps the checksum it
    /// has. Returns the state the migration was in before.
    pub async fn force_complete(
        &self,
        db: &dyn Database,
        id: &MigrationId,
        checksum: Option<&str>,
    ) -> MigrateResult<MigrationState> {
        let previous = self.state(db, id).await?;
        match previous {
            MigrationState::Pending => {
                let now = now_param();
                db.execute_with_params(
                    &format!(
                        "INSERT INTO {} (id, status, started_at, finished_at, checksum) \
                         VALUES (?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), ?)",
                        self.table_name
                    ),
                    &[
                        SqlValue::from(id.as_str()),
                        SqlValue::from(MigrationStatus::Completed.as_str()),
                        now.clone(),
                        now,
                        SqlValue::from(checksum),
                    ],
                )
                .await?;
            }
            _ => {
                db.execute_with_params(
                    &format!(
                        "UPDATE {} SET status = ?, finished_at = CAST(? AS TIMESTAMP), \
                         checksum = COALESCE(CAST(? AS VARCHAR), checksum), \
                         failure_reason = NULL WHERE id = ?",
                        self.table_name
                    ),
                    &[
                        SqlValue::from(MigrationStatus::Completed.as_str()),
                        now_param(),
                        SqlValue::from(checksum),
                        SqlValue::from(id.as_str()),
                    ],
                )
                .await?;
            }
        }
        log::debug!("{id}: {previous} -> completed (forced)");
        Ok(previous)
    }

    /// Any state → Pending by deleting the record.
    ///
    /// Returns whether a record existed.
    pub async fn remove(&self, db: &dyn Database, id: &MigrationId) -> MigrateResult<bool> {
        let deleted = db
            .execute_with_params(
                &format!("DELETE FROM {} WHERE id = ?", self.table_name),
                &[SqlValue::from(id.as_str())],
            )
            .await?;
        log::debug!("{id}: removed tracking record");
        Ok(deleted > 0)
    }

    /// Turn a zero-row conditional update into an `InvalidState` error.
    async fn expect_transition(
        &self,
        db: &dyn Database,
        id: &MigrationId,
        updated: usize,
        operation: &'static str,
    ) -> MigrateResult<()> {
        if updated > 0 {
            return Ok(());
        }
        Err(MigrateError::InvalidState {
            id: id.clone(),
            state: self.state(db, id).await?,
            operation,
        })
    }
}

fn now_param() -> SqlValue {
    SqlValue::Text(Utc::now().format(BIND_FORMAT).to_string())
}

fn parse_record(row: &SqlRow) -> MigrateResult<MigrationRecord> {
    let raw_id = text_at(row, 0).unwrap_or_default();
    let corrupt = |message: String| MigrateError::CorruptRecord {
        id: raw_id.to_string(),
        message,
    };

    let id = MigrationId::try_new(raw_id).ok_or_else(|| corrupt("invalid id".to_string()))?;
    let status = text_at(row, 1)
        .ok_or_else(|| corrupt("missing status".to_string()))?
        .parse::<MigrationStatus>()
        .map_err(corrupt)?;
    let started_at = text_at(row, 2)
        .ok_or_else(|| corrupt("missing started_at".to_string()))
        .and_then(|s| parse_timestamp(s).map_err(corrupt))?;
    let finished_at = text_at(row, 3)
        .map(|s| parse_timestamp(s).map_err(corrupt))
        .transpose()?;

    Ok(MigrationRecord {
        id,
        status,
        started_at,
        finished_at,
        checksum: text_at(row, 4).map(str::to_string),
        failure_reason: text_at(row, 5).map(str::to_string),
    })
}

fn text_at(row: &SqlRow, idx: usize) -> Option<&str> {
    row.get(idx).and_then(SqlValue::as_str)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(s, READ_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("bad timestamp '{s}': {e}"))
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;
