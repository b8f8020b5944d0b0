//! Error types for strata-core

use thiserror::Error;

/// Core error type for Strata
///
/// Everything a [`crate::MigrationSource`] can fail with is a discovery
/// error: the engine aborts before executing anything when it sees one.
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Migrations directory not found
    #[error("[E004] Migrations directory not found: {path}")]
    MigrationsDirNotFound { path: String },

    /// E005: Migration id is unusable
    #[error("[E005] Invalid migration id '{id}': {reason}")]
    InvalidMigrationId { id: String, reason: String },

    /// E008: Duplicate migration id
    #[error("[E008] Duplicate migration id: {id}")]
    DuplicateMigration { id: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
