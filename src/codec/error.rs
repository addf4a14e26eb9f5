//! Codec error types.

use thiserror::Error;

use crate::storage::InvalidNameError;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while turning keys and values into tree content and back.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A value could not be serialized.
    #[error("failed to encode value as {format}: {reason}")]
    Encode { format: &'static str, reason: String },

    /// Stored bytes could not be deserialized (corrupted or foreign content).
    #[error("failed to decode {format} content: {reason}")]
    Decode { format: &'static str, reason: String },

    /// A key cannot be stored as a tree entry name.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] InvalidNameError),
}

impl CodecError {
    pub(crate) fn encode(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            format,
            reason: err.to_string(),
        }
    }

    pub(crate) fn decode(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            format,
            reason: err.to_string(),
        }
    }
}
