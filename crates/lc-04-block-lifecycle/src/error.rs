//! Error types for the block lifecycle
//!
//! Two channels that never mix:
//!
//! - [`ChainError`]: the caller did something the chain can refuse and carry
//!   on from.
//! - [`FatalError`]: local state no longer matches what consensus expects.
//!   The only safe reaction is to stop the process.

use lc_01_storage_overlay::StorageError;
use lc_03_task_scheduler::TaskError;
use shared_types::TypesError;
use thiserror::Error;

/// Result type alias for recoverable chain operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Recoverable errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// DeliverTx/EndBlock without BeginBlock
    #[error("No block is open")]
    NoOpenBlock,

    /// Block already closed for commit; no more transactions
    #[error("Block {0} is sealed")]
    BlockSealed(u64),

    /// Same transaction delivered twice into one block
    #[error("Duplicated transaction in block: {0}")]
    DuplicateTransaction(String),

    /// Storage read failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored bytes do not decode
    #[error("Decoding error: {0}")]
    Decoding(String),
}

impl ChainError {
    /// Check if error is recoverable (every variant is)
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Caller misuse rather than a storage problem
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NoOpenBlock | Self::BlockSealed(_) | Self::DuplicateTransaction(_)
        )
    }
}

impl From<TypesError> for ChainError {
    fn from(err: TypesError) -> Self {
        ChainError::Decoding(err.to_string())
    }
}

/// Consistency violations; the process must halt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    /// BeginBlock while a block is already open
    #[error("Cannot begin block {height}: block {open} is still open")]
    BlockAlreadyOpen {
        /// Height requested
        height: u64,
        /// Height of the open block
        open: u64,
    },

    /// Commit/SetBlock without an open block
    #[error("No block is open to commit")]
    NoOpenBlock,

    /// Proposer could not be resolved to a validator
    #[error("Unknown validator {0}")]
    UnknownValidator(String),

    /// Block handed to SetBlock differs from the locally built one
    #[error("Block mismatch on {field}: {detail}")]
    BlockMismatch {
        /// Field that differs
        field: &'static str,
        /// Expected versus found
        detail: String,
    },

    /// Reward distribution could not be applied
    #[error("Block generation failed: {0}")]
    BlockGeneration(String),

    /// Storage failed while persisting or while opening a block
    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl FatalError {
    pub(crate) fn persistence(context: &str, err: impl std::fmt::Display) -> Self {
        FatalError::Persistence(format!("{}: {}", context, err))
    }
}

impl From<StorageError> for FatalError {
    fn from(err: StorageError) -> Self {
        FatalError::persistence("storage", err)
    }
}

impl From<ChainError> for FatalError {
    fn from(err: ChainError) -> Self {
        FatalError::persistence("chain state", err)
    }
}

impl From<TaskError> for FatalError {
    fn from(err: TaskError) -> Self {
        FatalError::persistence("task scheduler", err)
    }
}
