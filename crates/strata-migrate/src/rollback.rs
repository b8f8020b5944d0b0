//! Reversing applied migrations.

use crate::error::{MigrateError, MigrateResult};
use crate::runner::{discover, find};
use crate::state::{Direction, MigrationState};
use crate::tracker::VersionTracker;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use strata_core::{Migration, MigrationId, MigrationSource};
use strata_db::Database;

/// Which completed migrations a rollback reverses.
///
/// Selection always runs over completed records in reverse completion order
/// (most recently finished first, ties broken by id descending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackStrategy {
    /// The most recently completed migration.
    Last,
    /// Every completed migration whose id sorts after this one.
    DownTo(MigrationId),
    /// The `n` most recently completed migrations.
    Steps(usize),
    /// Every completed migration.
    All,
}

impl FromStr for RollbackStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last" => return Ok(RollbackStrategy::Last),
            "all" => return Ok(RollbackStrategy::All),
            _ => {}
        }
        if let Some(id) = s.strip_prefix("down-to:") {
            return MigrationId::try_new(id)
                .map(RollbackStrategy::DownTo)
                .ok_or_else(|| format!("invalid migration id in '{s}'"));
        }
        if let Some(n) = s.strip_prefix("steps:") {
            return match n.parse::<usize>() {
                Ok(0) => Err("steps must be at least 1".to_string()),
                Ok(n) => Ok(RollbackStrategy::Steps(n)),
                Err(_) => Err(format!("invalid step count in '{s}'")),
            };
        }
        Err(format!(
            "unknown rollback strategy '{s}' (expected last, down-to:ID, steps:N or all)"
        ))
    }
}

impl fmt::Display for RollbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackStrategy::Last => write!(f, "last"),
            RollbackStrategy::DownTo(id) => write!(f, "down-to:{id}"),
            RollbackStrategy::Steps(n) => write!(f, "steps:{n}"),
            RollbackStrategy::All => write!(f, "all"),
        }
    }
}

/// Outcome of a rollback.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackReport {
    /// Migrations reversed, in execution order.
    pub rolled_back: Vec<MigrationId>,
    /// Migrations a dry run would reverse, in execution order.
    pub planned: Vec<MigrationId>,
    pub dry_run: bool,
}

impl RollbackReport {
    pub fn is_noop(&self) -> bool {
        self.rolled_back.is_empty() && self.planned.is_empty()
    }
}

/// Reverses completed migrations.
pub struct RollbackEngine {
    source: Arc<dyn MigrationSource>,
    tracker: VersionTracker,
}

impl RollbackEngine {
    pub fn new(source: Arc<dyn MigrationSource>, tracker: VersionTracker) -> Self {
        Self { source, tracker }
    }

    /// Select the migrations `strategy` would reverse, in execution order.
    ///
    /// Every selected migration must still be in the source and must have a
    /// reverse action; otherwise the whole plan is rejected.
    pub async fn plan(
        &self,
        db: &dyn Database,
        strategy: &RollbackStrategy,
    ) -> MigrateResult<Vec<Arc<Migration>>> {
        let migrations = discover(self.source.as_ref())?;
        let table_exists = self.tracker.exists(db).await?;

        if let RollbackStrategy::DownTo(target) = strategy {
            let in_source = migrations.iter().any(|m| m.id() == target);
            let tracked = table_exists && self.tracker.get(db, target).await?.is_some();
            if !in_source && !tracked {
                return Err(MigrateError::NotFound {
                    id: target.to_string(),
                });
            }
        }

        let completed = if table_exists {
            self.tracker.completed_by_recency(db).await?
        } else {
            Vec::new()
        };

        let selected: Vec<MigrationId> = match strategy {
            RollbackStrategy::Last => completed.into_iter().take(1).map(|r| r.id).collect(),
            RollbackStrategy::Steps(n) => completed.into_iter().take(*n).map(|r| r.id).collect(),
            RollbackStrategy::All => completed.into_iter().map(|r| r.id).collect(),
            RollbackStrategy::DownTo(target) => completed
                .into_iter()
                .map(|r| r.id)
                .filter(|id| id > target)
                .collect(),
        };

        selected
            .iter()
            .map(|id| {
                let migration = find(&migrations, id)?;
                if !migration.is_reversible() {
                    return Err(MigrateError::Irreversible { id: id.clone() });
                }
                Ok(Arc::clone(migration))
            })
            .collect()
    }

    /// Reverse the migrations selected by `strategy`.
    ///
    /// Each step runs the reverse action and then deletes the tracking
    /// record. A failing step stops the rollback; steps before it stay
    /// rolled back and the failing migration stays completed.
    pub async fn rollback(
        &self,
        db: &dyn Database,
        strategy: &RollbackStrategy,
        dry_run: bool,
    ) -> MigrateResult<RollbackReport> {
        let plan = self.plan(db, strategy).await?;
        let mut report = RollbackReport {
            dry_run,
            ..RollbackReport::default()
        };

        if plan.is_empty() {
            log::info!("Nothing to roll back");
            return Ok(report);
        }

        if dry_run {
            for migration in &plan {
                log::info!("Would roll back {}", migration.id());
                report.planned.push(migration.id().clone());
            }
            return Ok(report);
        }

        for migration in &plan {
            let id = migration.id();
            match migration.down(db).await {
                Some(Ok(())) => {
                    self.tracker.remove(db, id).await?;
                    log::info!("Rolled back {id}");
                    report.rolled_back.push(id.clone());
                }
                Some(Err(e)) => {
                    log::error!("Rollback of {id} failed: {e}");
                    return Err(MigrateError::Execution {
                        id: id.clone(),
                        direction: Direction::Down,
                        state: MigrationState::Completed,
                        message: e.to_string(),
                        completed: report.rolled_back,
                    });
                }
                None => return Err(MigrateError::Irreversible { id: id.clone() }),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "rollback_test.rs"]
mod tests;
