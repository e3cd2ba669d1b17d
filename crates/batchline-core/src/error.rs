//! Error types for the batch engine

use thiserror::Error;

use crate::meta::types::BatchStatus;

/// Result type alias for batch operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Main error type for the batch engine
///
/// Item-level errors (`TransientItem`, `FatalItem`) are raised by sources and
/// transformers and absorbed by the engine's skip policy up to its limit.
/// `Transaction` errors trigger a chunk rollback followed by retry-or-abort.
/// Everything else is surfaced to the caller unchanged.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Transient item error: {0}")]
    TransientItem(String),

    #[error("Fatal item error: {0}")]
    FatalItem(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Job '{job_name}' already has an active execution (id {execution_id})")]
    DuplicateExecution { job_name: String, execution_id: i64 },

    #[error("Recovery rejected for execution {execution_id}: status is {status}")]
    Recovery {
        execution_id: i64,
        status: BatchStatus,
    },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: BatchStatus, to: BatchStatus },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BatchError {
    /// Whether the chunk that hit this error is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BatchError::TransientItem(_) | BatchError::Transaction(_)
        )
    }

    /// Whether this error came from a uniqueness violation in the store
    pub(crate) fn is_unique_violation(&self) -> bool {
        match self {
            BatchError::Store(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
