//! Common error types for credvault.

use thiserror::Error;

/// Top-level error type for credvault operations.
///
/// `Auth` and `Integrity` carry no payload: their messages are fixed so a
/// caller cannot learn which part of a check failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing caller input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Presented master secret was rejected.
    #[error("Invalid master secret")]
    Auth,

    /// A sealed field failed authenticated decryption.
    #[error("Integrity check failed: data is corrupted or the key is wrong")]
    Integrity,

    /// Temporary failure (entropy source, derivation timeout); safe to retry.
    #[error("Temporary failure: {0}")]
    Transient(String),

    /// Cryptographic primitive failed for a reason other than authentication.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// Whether the caller may retry the operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
