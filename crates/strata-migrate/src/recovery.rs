//! Operator-invoked repairs of the tracking table.
//!
//! Every operation here changes recorded state directly and can hide real
//! problems, so each one requires an explicit consent value. Prompting for
//! that consent is the caller's job; the engine only checks the value.

use crate::error::{MigrateError, MigrateResult};
use crate::runner::{apply_forward, discover, find};
use crate::state::{MigrationRecord, MigrationState};
use crate::tracker::VersionTracker;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::{MigrationId, MigrationSource};
use strata_db::Database;

/// Consent for marking migrations completed without running them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmGate {
    /// The operator answered a confirmation prompt.
    pub confirmed: bool,
    /// The operator passed `--force` and skipped the prompt.
    pub force: bool,
}

impl ConfirmGate {
    pub fn confirmed() -> Self {
        Self {
            confirmed: true,
            force: false,
        }
    }

    pub fn forced() -> Self {
        Self {
            confirmed: false,
            force: true,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.confirmed || self.force
    }
}

/// Consent for dropping the tracking table.
///
/// `table_name` must repeat the tracking table's name exactly. There is no
/// force variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropAcknowledgement {
    pub confirmed: bool,
    pub table_name: String,
}

/// Which non-completed migrations `mark_all_completed` touches.
///
/// | scope             | pending | failed | in progress |
/// |-------------------|---------|--------|-------------|
/// | PendingOnly       | mark    | skip   | skip        |
/// | IncludeFailed     | mark    | mark   | skip        |
/// | IncludeInProgress | mark    | skip   | mark        |
/// | All               | mark    | mark   | mark        |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkScope {
    #[default]
    PendingOnly,
    IncludeFailed,
    IncludeInProgress,
    All,
}

impl MarkScope {
    /// Scope from the CLI's `--include-failed`, `--include-in-progress` and
    /// `--all` flags. Both include flags together mean `All`.
    pub fn from_flags(include_failed: bool, include_in_progress: bool, all: bool) -> Self {
        match (all || (include_failed && include_in_progress), include_failed, include_in_progress) {
            (true, _, _) => MarkScope::All,
            (false, true, _) => MarkScope::IncludeFailed,
            (false, _, true) => MarkScope::IncludeInProgress,
            _ => MarkScope::PendingOnly,
        }
    }

    fn includes_failed(self) -> bool {
        matches!(self, MarkScope::IncludeFailed | MarkScope::All)
    }

    fn includes_in_progress(self) -> bool {
        matches!(self, MarkScope::IncludeInProgress | MarkScope::All)
    }
}

/// Tally of a `mark_all_completed` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MarkAllSummary {
    /// Source migrations plus dirty records with no source migration.
    pub total: usize,
    pub already_completed: usize,
    /// Pending migrations marked completed.
    pub newly_marked: usize,
    pub failed_marked: usize,
    pub in_progress_marked: usize,
    pub failed_skipped: usize,
    pub in_progress_skipped: usize,
}

impl MarkAllSummary {
    /// Migrations whose record changed.
    pub fn marked(&self) -> usize {
        self.newly_marked + self.failed_marked + self.in_progress_marked
    }
}

/// Retry, mark-completed and table reset.
pub struct RecoveryOperations {
    source: Arc<dyn MigrationSource>,
    tracker: VersionTracker,
}

impl RecoveryOperations {
    pub fn new(source: Arc<dyn MigrationSource>, tracker: VersionTracker) -> Self {
        Self { source, tracker }
    }

    /// Re-run a failed migration.
    ///
    /// The record goes back to in-progress, the forward action runs, and the
    /// outcome is recorded exactly like a step of a normal run.
    pub async fn retry(&self, db: &dyn Database, id: &str) -> MigrateResult<()> {
        let migrations = discover(self.source.as_ref())?;
        let migration = find(&migrations, id)?;

        self.tracker.ensure_table(db).await?;
        let state = self.tracker.state(db, id).await?;
        if state != MigrationState::Failed {
            return Err(MigrateError::InvalidState {
                id: migration.id().clone(),
                state,
                operation: "retry",
            });
        }

        self.tracker.retry(db, migration.id()).await?;
        log::info!("Retrying {id}");
        apply_forward(&self.tracker, db, migration).await
    }

    /// Record a migration as completed without running it.
    ///
    /// An id with a tracking record but no source migration is settled with
    /// the checksum it already has. Returns `false` when it already was
    /// completed.
    pub async fn mark_completed(
        &self,
        db: &dyn Database,
        id: &str,
        gate: ConfirmGate,
    ) -> MigrateResult<bool> {
        if !gate.is_satisfied() {
            return Err(MigrateError::ConfirmationRequired {
                operation: "mark-completed",
            });
        }
        let migrations = discover(self.source.as_ref())?;
        self.tracker.ensure_table(db).await?;
        let (id, checksum) = match find(&migrations, id) {
            Ok(migration) => (migration.id().clone(), Some(migration.checksum())),
            Err(not_found) => match self.tracker.get(db, id).await? {
                Some(record) => {
                    log::warn!("{id} has no source migration; keeping its recorded checksum");
                    (record.id, None)
                }
                None => return Err(not_found),
            },
        };

        if self.tracker.state(db, &id).await? == MigrationState::Completed {
            log::info!("{id} is already completed");
            return Ok(false);
        }

        let previous = self
            .tracker
            .force_complete(db, &id, checksum.as_deref())
            .await?;
        log::info!("Marked {id} completed (was {previous})");
        Ok(true)
    }

    /// Record every source migration in `scope` as completed without
    /// running anything.
    ///
    /// Failed and in-progress records with no source migration follow the
    /// same scope and keep their recorded checksum.
    pub async fn mark_all_completed(
        &self,
        db: &dyn Database,
        scope: MarkScope,
        gate: ConfirmGate,
    ) -> MigrateResult<MarkAllSummary> {
        if !gate.is_satisfied() {
            return Err(MigrateError::ConfirmationRequired {
                operation: "mark-all-completed",
            });
        }
        let migrations = discover(self.source.as_ref())?;
        self.tracker.ensure_table(db).await?;

        let mut records: BTreeMap<MigrationId, MigrationRecord> = self
            .tracker
            .list(db)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        let mut summary = MarkAllSummary::default();
        let mut to_mark: Vec<(MigrationId, Option<String>)> = Vec::new();

        let source_states: Vec<(MigrationId, Option<String>, MigrationState)> = migrations
            .iter()
            .map(|m| {
                let state = MigrationState::of(records.remove(m.id()).as_ref());
                (m.id().clone(), Some(m.checksum()), state)
            })
            .collect();
        let orphan_states = records
            .into_values()
            .filter(|r| r.state().is_dirty())
            .map(|r| {
                let state = r.state();
                (r.id, None, state)
            });

        for (id, checksum, state) in source_states.into_iter().chain(orphan_states) {
            summary.total += 1;
            match state {
                MigrationState::Completed => summary.already_completed += 1,
                MigrationState::Pending => {
                    summary.newly_marked += 1;
                    to_mark.push((id, checksum));
                }
                MigrationState::Failed if scope.includes_failed() => {
                    summary.failed_marked += 1;
                    to_mark.push((id, checksum));
                }
                MigrationState::Failed => summary.failed_skipped += 1,
                MigrationState::InProgress if scope.includes_in_progress() => {
                    summary.in_progress_marked += 1;
                    to_mark.push((id, checksum));
                }
                MigrationState::InProgress => summary.in_progress_skipped += 1,
            }
        }

        for (id, checksum) in &to_mark {
            self.tracker
                .force_complete(db, id, checksum.as_deref())
                .await?;
        }

        log::info!(
            "Marked {} of {} migration(s) completed ({:?})",
            summary.marked(),
            summary.total,
            scope
        );
        Ok(summary)
    }

    /// Drop the tracking table and recreate it empty, losing all history.
    pub async fn drop_and_recreate(
        &self,
        db: &dyn Database,
        ack: &DropAcknowledgement,
    ) -> MigrateResult<()> {
        if !ack.confirmed || ack.table_name != self.tracker.table_name() {
            return Err(MigrateError::ConfirmationRequired {
                operation: "drop-and-recreate",
            });
        }
        self.tracker.drop_and_recreate(db).await
    }
}

#[cfg(test)]
#[path = "recovery_test.rs"]
mod tests;
