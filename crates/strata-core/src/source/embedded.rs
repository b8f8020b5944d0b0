//! Migrations compiled into the binary.

use super::{into_ordered, MigrationSource};
use crate::error::{CoreError, CoreResult};
use crate::migration::Migration;
use crate::migration_id::MigrationId;
use std::sync::Arc;

/// A migration bundled as static text, usually via `include_str!`.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedMigration {
    pub id: &'static str,
    pub up: Option<&'static str>,
    pub down: Option<&'static str>,
    pub description: Option<&'static str>,
}

impl EmbeddedMigration {
    /// Forward-only migration.
    pub const fn new(id: &'static str, up: &'static str) -> Self {
        Self {
            id,
            up: Some(up),
            down: None,
            description: None,
        }
    }

    /// Migration with both directions.
    pub const fn reversible(id: &'static str, up: &'static str, down: &'static str) -> Self {
        Self {
            id,
            up: Some(up),
            down: Some(down),
            description: None,
        }
    }
}

/// Source backed by a static table of [`EmbeddedMigration`]s.
///
/// ```
/// use strata_core::{EmbeddedMigration, EmbeddedSource, MigrationSource};
///
/// static MIGRATIONS: &[EmbeddedMigration] = &[
///     EmbeddedMigration::reversible("001_users", "CREATE TABLE users (id INT)", "DROP TABLE users"),
///     EmbeddedMigration::new("002_seed", "INSERT INTO users VALUES (1)"),
/// ];
///
/// let source = EmbeddedSource::new(MIGRATIONS);
/// assert_eq!(source.list().unwrap().len(), 2);
/// ```
pub struct EmbeddedSource {
    migrations: &'static [EmbeddedMigration],
}

impl EmbeddedSource {
    pub const fn new(migrations: &'static [EmbeddedMigration]) -> Self {
        Self { migrations }
    }
}

impl MigrationSource for EmbeddedSource {
    fn list(&self) -> CoreResult<Vec<Arc<Migration>>> {
        let mut out = Vec::with_capacity(self.migrations.len());
        for embedded in self.migrations {
            if embedded.up.is_none() && embedded.down.is_none() {
                log::debug!("Skipping embedded migration {} with no content", embedded.id);
                continue;
            }
            let id = MigrationId::try_new(embedded.id).ok_or_else(|| {
                CoreError::InvalidMigrationId {
                    id: embedded.id.to_string(),
                    reason: "ids must be non-empty and have no surrounding whitespace".to_string(),
                }
            })?;
            let mut migration = Migration::new(id, embedded.up.unwrap_or(""));
            if let Some(down) = embedded.down {
                migration = migration.with_down(down);
            }
            if let Some(description) = embedded.description {
                migration = migration.with_description(description);
            }
            out.push(Arc::new(migration));
        }
        into_ordered(out)
    }

    fn kind(&self) -> &'static str {
        "embedded"
    }
}
