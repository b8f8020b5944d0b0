//! Runtime context for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_core::{Config, DirectorySource};
use strata_db::DuckDbBackend;
use strata_migrate::{MigrationRunner, VersionTracker};

use crate::cli::GlobalArgs;

/// An open database and a runner wired to the resolved configuration
pub struct RuntimeContext {
    /// Absolute or project-relative migrations directory
    pub migrations_path: PathBuf,

    pub db: DuckDbBackend,

    pub runner: MigrationRunner,
}

impl RuntimeContext {
    /// Create a new runtime context from global arguments
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let project_path = Path::new(&args.project_dir);
        let config = resolve_config(args)?;

        let migrations_path = config.migrations_path(project_path);
        let db_path = if config.database.path == ":memory:" {
            config.database.path.clone()
        } else {
            project_path
                .join(&config.database.path)
                .to_string_lossy()
                .into_owned()
        };
        log::debug!(
            "Using database {db_path}, migrations in {}, tracking table {}",
            migrations_path.display(),
            config.tracking_table
        );

        let db = DuckDbBackend::new(&db_path).context("Failed to connect to database")?;
        let tracker = VersionTracker::new(config.tracking_table.clone())
            .context("Invalid tracking table name")?;
        let source = Arc::new(DirectorySource::new(migrations_path.clone()));
        let runner = MigrationRunner::new(source, tracker);

        Ok(Self {
            migrations_path,
            db,
            runner,
        })
    }

    pub fn tracking_table(&self) -> &str {
        self.runner.tracker().table_name()
    }
}

/// Load the config file (or defaults) and apply flag and environment overrides.
fn resolve_config(args: &GlobalArgs) -> Result<Config> {
    let project_path = Path::new(&args.project_dir);
    let mut config = if let Some(config_path) = &args.config {
        Config::load(Path::new(config_path)).context("Failed to load configuration file")?
    } else {
        Config::load_from_dir_or_default(project_path)
            .context("Failed to load project configuration")?
    };

    if let Some(database) = &args.database {
        config.database.path = database.clone();
    }
    if let Some(dir) = &args.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    if let Some(table) = &args.tracking_table {
        config.tracking_table = table.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
