//! Migration engine for Strata.
//!
//! Applies migrations from a [`strata_core::MigrationSource`] exactly once,
//! in id order, recording each outcome in a tracking table owned by
//! [`VersionTracker`]. Failed or interrupted runs leave "dirty" records that
//! block further runs until an operator repairs them with
//! [`RecoveryOperations`] or explicitly forces past them.
//!
//! # Concurrency
//!
//! The engine assumes a single writer per tracking table. It takes no lock
//! of its own: callers that may run migrations from several processes must
//! hold an external lock (for example a database advisory lock) around the
//! whole operation. Forward runs and rollbacks must not overlap.

pub mod error;
pub mod recovery;
pub mod rollback;
pub mod runner;
pub mod state;
pub mod status;
pub mod tracker;

pub use error::{MigrateError, MigrateResult};
pub use recovery::{ConfirmGate, DropAcknowledgement, MarkAllSummary, MarkScope, RecoveryOperations};
pub use rollback::{RollbackEngine, RollbackReport, RollbackStrategy};
pub use runner::{MigrationRunner, RunOptions, RunReport, RunTarget};
pub use state::{Direction, MigrationRecord, MigrationState, MigrationStatus};
pub use status::{ChecksumMismatch, StatusCounts, StatusEntry, StatusReport};
pub use tracker::VersionTracker;
