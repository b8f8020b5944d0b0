//! Configuration types and parsing for strata.yml
//!
//! The engine never reads files or the environment itself: the CLI loads a
//! [`Config`], applies its flag and environment overrides, validates the
//! result and hands it over.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the tracking table.
pub const DEFAULT_TRACKING_TABLE: &str = "__schema_migrations";

/// Config file names searched for in a project directory, in order.
const CONFIG_FILE_NAMES: [&str; 2] = ["strata.yml", "strata.yaml"];

/// Project configuration from strata.yml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Directory containing one sub-directory per migration
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Name of the tracking table, optionally schema-qualified
    #[serde(default = "default_tracking_table")]
    pub tracking_table: String,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the DuckDB database file, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

fn default_tracking_table() -> String {
    DEFAULT_TRACKING_TABLE.to_string()
}

fn default_db_path() -> String {
    "strata.duckdb".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            migrations_dir: default_migrations_dir(),
            tracking_table: default_tracking_table(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for strata.yml or strata.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match find_config_file(dir) {
            Some(path) => Self::load(&path),
            None => Err(CoreError::ConfigNotFound {
                path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
            }),
        }
    }

    /// Like [`load_from_dir`](Self::load_from_dir), but falls back to the
    /// defaults when the directory has no config file.
    pub fn load_from_dir_or_default(dir: &Path) -> CoreResult<Self> {
        match find_config_file(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Resolve the migrations directory against a project root.
    pub fn migrations_path(&self, root: &Path) -> PathBuf {
        let dir = Path::new(&self.migrations_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            root.join(dir)
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }
        if self.migrations_dir.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_dir cannot be empty".to_string(),
            });
        }
        validate_table_name(&self.tracking_table)
    }
}

fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Check that a tracking table name is a plain or schema-qualified SQL
/// identifier.
///
/// The name is interpolated into DDL and DML, so nothing beyond
/// `[A-Za-z_][A-Za-z0-9_]*` (optionally `schema.table`) is accepted.
pub fn validate_table_name(name: &str) -> CoreResult<()> {
    let parts: Vec<&str> = name.split('.').collect();
    let valid = parts.len() <= 2 && parts.iter().all(|part| is_identifier(part));
    if valid {
        Ok(())
    } else {
        Err(CoreError::ConfigInvalid {
            message: format!(
                "tracking table '{name}' must be an identifier like __schema_migrations or ops.schema_migrations"
            ),
        })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
