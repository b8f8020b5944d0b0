//! Programmatic migration registry.

use super::{into_ordered, MigrationSource};
use crate::error::CoreResult;
use crate::migration::Migration;
use std::sync::Arc;

/// Source whose migrations are registered in code.
///
/// Registration order does not matter; [`MigrationSource::list`] sorts by
/// id. Duplicates are only reported when listing, so a registry can be
/// assembled from several modules before it is validated.
#[derive(Debug, Default)]
pub struct CodeSource {
    migrations: Vec<Arc<Migration>>,
}

impl CodeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration (builder style).
    pub fn with(mut self, migration: Migration) -> Self {
        self.add(migration);
        self
    }

    /// Register a migration.
    pub fn add(&mut self, migration: Migration) {
        self.migrations.push(Arc::new(migration));
    }

    /// Register an already shared migration.
    pub fn add_shared(&mut self, migration: Arc<Migration>) {
        self.migrations.push(migration);
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl MigrationSource for CodeSource {
    fn list(&self) -> CoreResult<Vec<Arc<Migration>>> {
        into_ordered(self.migrations.clone())
    }

    fn kind(&self) -> &'static str {
        "code"
    }
}
