//! Filesystem migration discovery.
//!
//! Layout: one sub-directory per migration under the root. The directory
//! name is the id; `up.sql` holds the forward action and `down.sql` the
//! reverse action.
//!
//! ```text
//! migrations/
//!   20240101_create_users/
//!     up.sql
//!     down.sql
//!   20240215_add_email/
//!     up.sql
//! ```

use super::{into_ordered, MigrationSource};
use crate::error::{CoreError, CoreResult};
use crate::migration::Migration;
use crate::migration_id::MigrationId;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const UP_FILE: &str = "up.sql";
const DOWN_FILE: &str = "down.sql";

/// Source that reads migrations from a directory tree.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_one(&self, dir: &Path, name: &str) -> CoreResult<Option<Migration>> {
        let up = read_optional(&dir.join(UP_FILE))?;
        let down = read_optional(&dir.join(DOWN_FILE))?;

        if up.is_none() && down.is_none() {
            log::debug!("Skipping {} (no {UP_FILE} or {DOWN_FILE})", dir.display());
            return Ok(None);
        }

        let id = MigrationId::try_new(name).ok_or_else(|| CoreError::InvalidMigrationId {
            id: name.to_string(),
            reason: "directory names must not have surrounding whitespace".to_string(),
        })?;

        let mut migration = Migration::new(id, up.unwrap_or_default());
        if let Some(down) = down {
            migration = migration.with_down(down);
        }
        Ok(Some(migration))
    }
}

/// Read a file if it exists.
fn read_optional(path: &Path) -> CoreResult<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })
}

impl MigrationSource for DirectorySource {
    fn list(&self) -> CoreResult<Vec<Arc<Migration>>> {
        if !self.root.is_dir() {
            return Err(CoreError::MigrationsDirNotFound {
                path: self.root.display().to_string(),
            });
        }

        let entries = std::fs::read_dir(&self.root).map_err(|e| CoreError::IoWithPath {
            path: self.root.display().to_string(),
            source: e,
        })?;

        let mut migrations = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                return Err(CoreError::InvalidMigrationId {
                    id: path.display().to_string(),
                    reason: "directory name is not valid UTF-8".to_string(),
                });
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(migration) = self.load_one(&path, name)? {
                migrations.push(Arc::new(migration));
            }
        }

        log::debug!(
            "Discovered {} migration(s) in {}",
            migrations.len(),
            self.root.display()
        );
        into_ordered(migrations)
    }

    fn kind(&self) -> &'static str {
        "directory"
    }
}
