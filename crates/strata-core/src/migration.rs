//! The migration value type and the actions it carries.

use crate::checksum::migration_checksum;
use crate::migration_id::MigrationId;
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use strata_db::{Database, DbResult};

/// One direction of a migration: something that can run against a database.
///
/// SQL bodies (`String`, `&'static str`) implement this out of the box.
/// Code migrations implement it directly.
#[async_trait]
pub trait Executable: Send + Sync {
    /// Run the action against `db`.
    async fn execute(&self, db: &dyn Database) -> DbResult<()>;

    /// Stable textual form of the action, hashed into the migration checksum.
    ///
    /// Must change whenever the action's effect changes.
    fn fingerprint(&self) -> Cow<'_, str>;
}

/// Run a SQL body, treating a blank body as a no-op.
async fn execute_sql(sql: &str, db: &dyn Database) -> DbResult<()> {
    if sql.trim().is_empty() {
        return Ok(());
    }
    db.execute_batch(sql).await
}

#[async_trait]
impl Executable for String {
    async fn execute(&self, db: &dyn Database) -> DbResult<()> {
        execute_sql(self, db).await
    }

    fn fingerprint(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

#[async_trait]
impl Executable for &'static str {
    async fn execute(&self, db: &dyn Database) -> DbResult<()> {
        execute_sql(self, db).await
    }

    fn fingerprint(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

/// A single schema change: a forward action and an optional reverse action.
///
/// Immutable once built. Sources hand migrations out as `Arc<Migration>` so
/// the engine, the source and test helpers share one copy.
pub struct Migration {
    id: MigrationId,
    description: Option<String>,
    up: Box<dyn Executable>,
    down: Option<Box<dyn Executable>>,
}

impl Migration {
    /// Create an irreversible migration with the given forward action.
    pub fn new(id: MigrationId, up: impl Executable + 'static) -> Self {
        Self {
            id,
            description: None,
            up: Box::new(up),
            down: None,
        }
    }

    /// Attach a reverse action.
    pub fn with_down(mut self, down: impl Executable + 'static) -> Self {
        self.down = Some(Box::new(down));
        self
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &MigrationId {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether a reverse action is present.
    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }

    /// Run the forward action.
    pub async fn up(&self, db: &dyn Database) -> DbResult<()> {
        self.up.execute(db).await
    }

    /// Run the reverse action, or return `None` if the migration has none.
    pub async fn down(&self, db: &dyn Database) -> Option<DbResult<()>> {
        match &self.down {
            Some(down) => Some(down.execute(db).await),
            None => None,
        }
    }

    /// Content hash of the forward and reverse definitions.
    pub fn checksum(&self) -> String {
        let down = self.down.as_ref().map(|d| d.fingerprint());
        migration_checksum(&self.up.fingerprint(), down.as_deref())
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("reversible", &self.is_reversible())
            .finish()
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
