//! strata-core - Core library for Strata
//!
//! This crate provides the migration value type, the [`MigrationSource`]
//! capability with its directory, embedded and code-registry backends,
//! content checksums, and the resolved configuration struct handed to the
//! migration engine.

pub mod checksum;
pub mod config;
pub mod error;
pub mod migration;
pub mod migration_id;
pub mod source;

pub use checksum::migration_checksum;
pub use config::{validate_table_name, Config, DatabaseConfig, DEFAULT_TRACKING_TABLE};
pub use error::{CoreError, CoreResult};
pub use migration::{Executable, Migration};
pub use migration_id::MigrationId;
pub use source::{CodeSource, DirectorySource, EmbeddedMigration, EmbeddedSource, MigrationSource};
