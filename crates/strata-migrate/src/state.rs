//! Persisted migration status and the derived run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strata_core::MigrationId;

/// Status stored in the tracking table.
///
/// There is no `Pending` status: a migration without a row is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// `begin` was called and neither `complete` nor `fail` followed yet.
    /// Seen outside a run, this means the process died mid-migration.
    InProgress,
    Completed,
    Failed,
}

impl MigrationStatus {
    /// Value written to the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::InProgress => "in_progress",
            MigrationStatus::Completed => "completed",
            MigrationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(MigrationStatus::InProgress),
            "completed" => Ok(MigrationStatus::Completed),
            "failed" => Ok(MigrationStatus::Failed),
            other => Err(format!("unknown migration status '{other}'")),
        }
    }
}

/// Run state of a migration, derived by joining the source with the
/// tracking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl MigrationState {
    /// State for an optional tracking record.
    pub fn of(record: Option<&MigrationRecord>) -> Self {
        record.map_or(MigrationState::Pending, |r| r.status.into())
    }

    /// Failed and in-progress records block a normal run.
    pub fn is_dirty(&self) -> bool {
        matches!(self, MigrationState::InProgress | MigrationState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationState::Pending => "pending",
            MigrationState::InProgress => "in_progress",
            MigrationState::Completed => "completed",
            MigrationState::Failed => "failed",
        }
    }
}

impl From<MigrationStatus> for MigrationState {
    fn from(status: MigrationStatus) -> Self {
        match status {
            MigrationStatus::InProgress => MigrationState::InProgress,
            MigrationStatus::Completed => MigrationState::Completed,
            MigrationStatus::Failed => MigrationState::Failed,
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which action of a migration was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// One row of the tracking table.
///
/// Invariant: `finished_at` is set iff `status` is `Completed` or `Failed`,
/// and `failure_reason` is set only when `status` is `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub id: MigrationId,
    pub status: MigrationStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl MigrationRecord {
    pub fn state(&self) -> MigrationState {
        self.status.into()
    }
}
