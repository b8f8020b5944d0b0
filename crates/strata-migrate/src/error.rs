//! Error types for the migration engine.

use crate::state::{Direction, MigrationState};
use strata_core::{CoreError, MigrationId};
use strata_db::DbError;
use thiserror::Error;

/// Migration engine errors.
///
/// Nothing here is retried by the engine. Every variant that concerns a
/// single migration carries its id, and its state where one applies.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Discovery failed before anything ran (M001).
    #[error("[M001] Migration discovery failed: {0}")]
    Discovery(#[from] CoreError),

    /// A forward or reverse action failed; the run or rollback halted (M002).
    #[error("[M002] Migration {id} failed ({direction}), now {state}: {message}")]
    Execution {
        id: MigrationId,
        direction: Direction,
        state: MigrationState,
        message: String,
        /// Steps of the same run or rollback that finished before this one.
        completed: Vec<MigrationId>,
    },

    /// The tracking table holds failed or in-progress records (M003).
    #[error("[M003] Dirty state: migration {id} is {state} ({n} dirty record(s)). Use retry, mark-completed, or --force", n = .dirty.len())]
    DirtyState {
        id: MigrationId,
        state: MigrationState,
        dirty: Vec<MigrationId>,
    },

    /// The id is not known to the migration source (M004).
    #[error("[M004] Migration not found: {id}")]
    NotFound { id: String },

    /// The requested transition is not valid from the current state (M005).
    #[error("[M005] Cannot {operation} migration {id}: it is {state}")]
    InvalidState {
        id: MigrationId,
        state: MigrationState,
        operation: &'static str,
    },

    /// Recorded checksum differs from the current definition (M006).
    #[error("[M006] Checksum mismatch for {id}: recorded {recorded}, current {current}")]
    Validation {
        id: MigrationId,
        recorded: String,
        current: String,
    },

    /// Rollback selected a migration without a reverse action (M007).
    #[error("[M007] Migration {id} has no reverse action and cannot be rolled back")]
    Irreversible { id: MigrationId },

    /// A recovery operation was invoked without the required consent (M008).
    #[error("[M008] {operation} requires explicit confirmation")]
    ConfirmationRequired { operation: &'static str },

    /// Invalid engine configuration, such as a bad tracking table name (M009).
    #[error("[M009] Invalid configuration: {0}")]
    Config(#[source] CoreError),

    /// A tracking row could not be decoded (M010).
    #[error("[M010] Corrupt tracking record for {id}: {message}")]
    CorruptRecord { id: String, message: String },

    /// Database error while reading or writing the tracking table (M011).
    #[error("[M011] Tracking table error: {0}")]
    Database(#[from] DbError),
}

impl MigrateError {
    /// Attach the steps that finished before an `Execution` failure.
    pub(crate) fn after_steps(self, steps: &[MigrationId]) -> Self {
        match self {
            MigrateError::Execution {
                id,
                direction,
                state,
                message,
                ..
            } => MigrateError::Execution {
                id,
                direction,
                state,
                message,
                completed: steps.to_vec(),
            },
            other => other,
        }
    }
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;
