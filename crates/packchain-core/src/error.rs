//! Error types for packchain core.

use thiserror::Error;

/// Errors raised while decoding or interpreting core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid object id length: expected 32 bytes, got {0}")]
    InvalidIdLength(usize),

    #[error("invalid blob store description: {0}")]
    InvalidBlobStore(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Naming errors for repository names, tags and stream references.
///
/// These are precondition failures: they are raised before any ledger or
/// blob-store call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} {name:?} must not contain the stream separator ':'")]
    ContainsSeparator { kind: &'static str, name: String },

    #[error("{kind} {name:?} must not contain control characters")]
    InvalidCharacter { kind: &'static str, name: String },

    #[error("stream reference {0:?} must have the form repo:tag")]
    MalformedStreamRef(String),
}
