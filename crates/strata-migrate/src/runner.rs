//! Forward migration runs.
//!
//! A run lists the source, loads every tracking row, refuses to start on a
//! dirty tracking table (unless forced), and then applies pending migrations
//! one at a time in ascending id order, halting on the first failure.

use crate::error::{MigrateError, MigrateResult};
use crate::recovery::RecoveryOperations;
use crate::rollback::RollbackEngine;
use crate::state::{Direction, MigrationRecord, MigrationState};
use crate::tracker::VersionTracker;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::{Migration, MigrationId, MigrationSource};
use strata_db::Database;

/// How far a run goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunTarget {
    /// Every pending migration.
    #[default]
    All,
    /// Pending migrations with an id up to and including this one.
    UpTo(MigrationId),
    /// At most this many pending migrations.
    Steps(usize),
}

/// Options for [`MigrationRunner::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Proceed despite failed or in-progress records. Those records are
    /// skipped and left as they are.
    pub force: bool,
    /// Report what would run without touching the database.
    pub dry_run: bool,
    pub target: RunTarget,
    /// Abort before executing anything if a completed migration's definition
    /// changed since it was applied.
    pub strict_checksums: bool,
}

/// Outcome of a forward run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Migrations applied by this run, in order.
    pub applied: Vec<MigrationId>,
    /// Migrations a dry run would apply, in order.
    pub planned: Vec<MigrationId>,
    /// Dirty migrations passed over by a forced run.
    pub skipped_dirty: Vec<MigrationId>,
    /// Completed migrations whose definition changed since they were applied.
    pub drifted: Vec<MigrationId>,
    pub already_applied: usize,
    pub dry_run: bool,
}

impl RunReport {
    /// True when the run had nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.planned.is_empty()
    }
}

/// Applies migrations from a source and records the outcome.
///
/// The runner assumes it is the only writer of its tracking table. Callers
/// running migrations from several processes must serialize them with an
/// external lock, and must not overlap a run with a rollback.
pub struct MigrationRunner {
    source: Arc<dyn MigrationSource>,
    tracker: VersionTracker,
}

impl MigrationRunner {
    pub fn new(source: Arc<dyn MigrationSource>, tracker: VersionTracker) -> Self {
        Self { source, tracker }
    }

    pub fn tracker(&self) -> &VersionTracker {
        &self.tracker
    }

    pub fn source(&self) -> &Arc<dyn MigrationSource> {
        &self.source
    }

    /// Rollback engine over the same source and tracking table.
    pub fn rollback_engine(&self) -> RollbackEngine {
        RollbackEngine::new(Arc::clone(&self.source), self.tracker.clone())
    }

    /// Recovery operations over the same source and tracking table.
    pub fn recovery(&self) -> RecoveryOperations {
        RecoveryOperations::new(Arc::clone(&self.source), self.tracker.clone())
    }

    /// Apply pending migrations.
    ///
    /// Nothing executes when discovery fails, when the tracking table is
    /// dirty and `force` is unset, or when `strict_checksums` finds drift.
    /// A failing migration is recorded as failed and the run stops there.
    pub async fn run(&self, db: &dyn Database, options: &RunOptions) -> MigrateResult<RunReport> {
        let migrations = discover(self.source.as_ref())?;

        let records = if options.dry_run {
            self.tracker.list_if_exists(db).await?
        } else {
            self.tracker.ensure_table(db).await?;
            self.tracker.list(db).await?
        };

        check_dirty(&records, options.force)?;

        let by_id: HashMap<&str, &MigrationRecord> =
            records.iter().map(|r| (r.id.as_str(), r)).collect();

        if let RunTarget::UpTo(target) = &options.target {
            if !migrations.iter().any(|m| m.id() == target) {
                return Err(MigrateError::NotFound {
                    id: target.to_string(),
                });
            }
        }

        let mut report = RunReport {
            dry_run: options.dry_run,
            ..RunReport::default()
        };
        let mut pending: Vec<&Arc<Migration>> = Vec::new();

        for migration in &migrations {
            let record = by_id.get(migration.id().as_str()).copied();
            match MigrationState::of(record) {
                MigrationState::Completed => {
                    report.already_applied += 1;
                    if let Some(recorded) = record.and_then(|r| r.checksum.as_deref()) {
                        let current = migration.checksum();
                        if recorded != current {
                            if options.strict_checksums {
                                return Err(MigrateError::Validation {
                                    id: migration.id().clone(),
                                    recorded: recorded.to_string(),
                                    current,
                                });
                            }
                            log::warn!(
                                "Migration {} changed since it was applied (checksum {} -> {})",
                                migration.id(),
                                recorded,
                                current
                            );
                            report.drifted.push(migration.id().clone());
                        }
                    }
                }
                state @ (MigrationState::InProgress | MigrationState::Failed) => {
                    log::warn!("Skipping {} migration {} (forced run)", state, migration.id());
                    report.skipped_dirty.push(migration.id().clone());
                }
                MigrationState::Pending => pending.push(migration),
            }
        }

        let selected: Vec<&Arc<Migration>> = match &options.target {
            RunTarget::All => pending,
            RunTarget::UpTo(target) => pending.into_iter().filter(|m| m.id() <= target).collect(),
            RunTarget::Steps(n) => pending.into_iter().take(*n).collect(),
        };

        if options.dry_run {
            for migration in selected {
                log::info!("Would apply {}", migration.id());
                report.planned.push(migration.id().clone());
            }
            return Ok(report);
        }

        for migration in selected {
            self.tracker.begin(db, migration.id()).await?;
            apply_forward(&self.tracker, db, migration)
                .await
                .map_err(|e| e.after_steps(&report.applied))?;
            report.applied.push(migration.id().clone());
        }

        if report.applied.is_empty() {
            log::info!("No pending migrations");
        }
        Ok(report)
    }
}

/// List the source, mapping discovery failures.
pub(crate) fn discover(source: &dyn MigrationSource) -> MigrateResult<Vec<Arc<Migration>>> {
    let migrations = source.list()?;
    log::debug!(
        "Discovered {} migration(s) from {} source",
        migrations.len(),
        source.kind()
    );
    Ok(migrations)
}

/// Find the migration with `id` in a discovered list.
pub(crate) fn find<'a>(migrations: &'a [Arc<Migration>], id: &str) -> MigrateResult<&'a Arc<Migration>> {
    migrations
        .iter()
        .find(|m| m.id().as_str() == id)
        .ok_or_else(|| MigrateError::NotFound { id: id.to_string() })
}

/// Abort with `DirtyState` when any record is failed or in progress.
fn check_dirty(records: &[MigrationRecord], force: bool) -> MigrateResult<()> {
    let dirty: Vec<&MigrationRecord> = records.iter().filter(|r| r.state().is_dirty()).collect();
    match dirty.first() {
        Some(first) if !force => Err(MigrateError::DirtyState {
            id: first.id.clone(),
            state: first.state(),
            dirty: dirty.iter().map(|r| r.id.clone()).collect(),
        }),
        Some(_) => {
            log::warn!(
                "Tracking table has {} dirty record(s); continuing because of --force",
                dirty.len()
            );
            Ok(())
        }
        None => Ok(()),
    }
}

/// Execute the forward action of a migration that is already in progress,
/// then record the outcome.
pub(crate) async fn apply_forward(
    tracker: &VersionTracker,
    db: &dyn Database,
    migration: &Migration,
) -> MigrateResult<()> {
    let id = migration.id();
    match migration.up(db).await {
        Ok(()) => {
            tracker.complete(db, id, &migration.checksum()).await?;
            log::info!("Applied {id}");
            Ok(())
        }
        Err(e) => {
            let message = e.to_string();
            tracker.fail(db, id, &message).await?;
            log::error!("Migration {id} failed: {message}");
            Err(MigrateError::Execution {
                id: id.clone(),
                direction: Direction::Up,
                state: MigrationState::Failed,
                message,
                completed: Vec::new(),
            })
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
