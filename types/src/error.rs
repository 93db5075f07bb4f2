//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors produced while building or parsing netmap types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid node attribute {raw:?}: {reason}")]
    InvalidAttribute { raw: String, reason: String },

    #[error("duplicate node attribute key: {0}")]
    DuplicateAttribute(String),

    #[error("unknown netmap status: {0}")]
    UnknownStatus(String),
}
