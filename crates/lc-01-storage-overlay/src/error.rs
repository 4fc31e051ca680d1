//! Error types for the storage overlay

use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by stores, overlays and codecs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Backend I/O failure
    #[error("KV store I/O error: {0}")]
    Io(String),

    /// Stored bytes do not decode
    #[error("KV store corruption: {0}")]
    Corruption(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// zstd compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<shared_types::TypesError> for StorageError {
    fn from(err: shared_types::TypesError) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
