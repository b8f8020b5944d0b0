//! Read-only views over the source joined with the tracking table.

use crate::error::MigrateResult;
use crate::runner::{discover, MigrationRunner};
use crate::state::{MigrationRecord, MigrationState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use strata_core::MigrationId;
use strata_db::Database;

/// State of one migration, or of a tracking row with no source migration.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub id: MigrationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub state: MigrationState,
    pub reversible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Completed, but the definition changed since it was applied.
    pub drifted: bool,
    /// Tracked, but no longer present in the source.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub orphaned: bool,
}

impl StatusEntry {
    fn from_orphan(record: &MigrationRecord) -> Self {
        Self {
            id: record.id.clone(),
            description: None,
            state: record.state(),
            reversible: false,
            started_at: Some(record.started_at),
            finished_at: record.finished_at,
            failure_reason: record.failure_reason.clone(),
            drifted: false,
            orphaned: true,
        }
    }
}

/// Per-state totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Every source migration with its state, plus tracking rows that no
/// longer match a source migration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub entries: Vec<StatusEntry>,
    pub orphaned: Vec<MigrationRecord>,
}

impl StatusReport {
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            total: self.entries.len(),
            ..StatusCounts::default()
        };
        for entry in &self.entries {
            match entry.state {
                MigrationState::Pending => counts.pending += 1,
                MigrationState::InProgress => counts.in_progress += 1,
                MigrationState::Completed => counts.completed += 1,
                MigrationState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Failed and in-progress entries in id order, followed by dirty
    /// orphaned records.
    pub fn failed(&self) -> Vec<StatusEntry> {
        self.entries
            .iter()
            .filter(|e| e.state.is_dirty())
            .cloned()
            .chain(
                self.orphaned
                    .iter()
                    .filter(|r| r.state().is_dirty())
                    .map(StatusEntry::from_orphan),
            )
            .collect()
    }

    /// Whether any tracking row, orphaned or not, blocks a normal run.
    pub fn is_dirty(&self) -> bool {
        self.entries.iter().any(|e| e.state.is_dirty())
            || self.orphaned.iter().any(|r| r.state().is_dirty())
    }
}

/// A completed migration whose definition no longer matches what was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumMismatch {
    pub id: MigrationId,
    pub recorded: String,
    pub current: String,
}

impl MigrationRunner {
    /// Join the source with the tracking table.
    ///
    /// Does not create the tracking table.
    pub async fn status(&self, db: &dyn Database) -> MigrateResult<StatusReport> {
        let migrations = discover(self.source().as_ref())?;
        let mut records: BTreeMap<MigrationId, MigrationRecord> = self
            .tracker()
            .list_if_exists(db)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let entries = migrations
            .iter()
            .map(|migration| {
                let record = records.remove(migration.id());
                let state = MigrationState::of(record.as_ref());
                let drifted = state == MigrationState::Completed
                    && record
                        .as_ref()
                        .and_then(|r| r.checksum.as_deref())
                        .is_some_and(|recorded| recorded != migration.checksum());
                StatusEntry {
                    id: migration.id().clone(),
                    description: migration.description().map(str::to_string),
                    state,
                    reversible: migration.is_reversible(),
                    started_at: record.as_ref().map(|r| r.started_at),
                    finished_at: record.as_ref().and_then(|r| r.finished_at),
                    failure_reason: record.and_then(|r| r.failure_reason),
                    drifted,
                    orphaned: false,
                }
            })
            .collect();

        Ok(StatusReport {
            entries,
            orphaned: records.into_values().collect(),
        })
    }

    /// Every completed migration whose recorded checksum differs from its
    /// current definition, in id order.
    pub async fn validate(&self, db: &dyn Database) -> MigrateResult<Vec<ChecksumMismatch>> {
        let migrations = discover(self.source().as_ref())?;
        let records: BTreeMap<MigrationId, MigrationRecord> = self
            .tracker()
            .list_if_exists(db)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let mismatches: Vec<ChecksumMismatch> = migrations
            .iter()
            .filter_map(|migration| {
                let record = records.get(migration.id())?;
                if record.state() != MigrationState::Completed {
                    return None;
                }
                let recorded = record.checksum.as_deref()?;
                let current = migration.checksum();
                (recorded != current).then(|| ChecksumMismatch {
                    id: migration.id().clone(),
                    recorded: recorded.to_string(),
                    current,
                })
            })
            .collect();

        for mismatch in &mismatches {
            log::warn!("Checksum mismatch for {}", mismatch.id);
        }
        Ok(mismatches)
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
