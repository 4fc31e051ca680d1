//! # Error Types
//!
//! Errors raised while decoding or signing shared entities.

use thiserror::Error;

/// Errors produced by the shared entity layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Textual address could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Public key bytes are not a valid ed25519 point.
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Signature did not verify against the signed content.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Binary encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for TypesError {
    fn from(err: bincode::Error) -> Self {
        TypesError::Serialization(err.to_string())
    }
}
