//! strata-db - Database abstraction layer for Strata
//!
//! This crate provides the `Database` trait that migrations and the tracking
//! table are executed through, plus a DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, SqlRow, SqlValue};
