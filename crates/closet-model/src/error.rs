//! Error types for the closet-model crate.
//!
//! Everything here is about malformed data handed to us by a caller:
//! a broken data URL, a preferences value that does not deserialize, and so on.
//! Loosely-typed provider replies never surface as errors; they go through the
//! parse-or-default helpers in [`crate::parser`] instead.

use thiserror::Error;

/// Errors raised while building or decoding closet data.
#[derive(Error, Debug)]
pub enum ClosetError {
    /// The string is not a `data:<mime>;base64,<data>` URL
    #[error("Invalid image payload: {reason}")]
    InvalidImagePayload { reason: String },

    /// The base64 section of a data URL did not decode
    #[error("Invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A referenced item is not in the catalog
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: String },

    /// A value failed validation (empty id, bad plan name, ...)
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ClosetError>;
