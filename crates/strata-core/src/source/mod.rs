//! Migration discovery.
//!
//! A [`MigrationSource`] yields the full, ordered, deduplicated list of
//! migrations. The engine only depends on the trait, so directory trees,
//! embedded bundles and code registries are interchangeable.

mod code;
mod directory;
mod embedded;

pub use code::CodeSource;
pub use directory::DirectorySource;
pub use embedded::{EmbeddedMigration, EmbeddedSource};

use crate::error::{CoreError, CoreResult};
use crate::migration::Migration;
use std::sync::Arc;

/// A provider of migrations.
///
/// `list` must be deterministic: two calls without external changes return
/// the same ids in the same (ascending, byte-wise lexicographic) order. Ids
/// are unique; a duplicate is a discovery error. Units with neither a
/// forward nor a reverse definition are omitted.
pub trait MigrationSource: Send + Sync {
    /// Discover every migration, ordered by id.
    fn list(&self) -> CoreResult<Vec<Arc<Migration>>>;

    /// Short backend name for log output.
    fn kind(&self) -> &'static str;
}

/// Sort migrations by id and reject duplicates.
pub(crate) fn into_ordered(mut migrations: Vec<Arc<Migration>>) -> CoreResult<Vec<Arc<Migration>>> {
    migrations.sort_by(|a, b| a.id().cmp(b.id()));
    if let Some(pair) = migrations.windows(2).find(|w| w[0].id() == w[1].id()) {
        return Err(CoreError::DuplicateMigration {
            id: pair[0].id().to_string(),
        });
    }
    Ok(migrations)
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
