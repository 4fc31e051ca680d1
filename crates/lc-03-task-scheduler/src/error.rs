//! Error types for the task scheduler

use lc_01_storage_overlay::StorageError;
use thiserror::Error;

/// Result type alias for task operations
pub type Result<T> = std::result::Result<T, TaskError>;

/// Errors that can occur while reading or writing tasks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Underlying storage failed
    #[error("Task storage error: {0}")]
    Storage(#[from] StorageError),

    /// Task id counter cannot advance
    #[error("Task id space exhausted")]
    IdsExhausted,
}
