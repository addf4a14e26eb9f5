//! Store error types.

use thiserror::Error;

use crate::codec::CodecError;
use crate::storage::{InvalidNameError, StorageError};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by [`Store`](crate::Store) operations.
///
/// A missing key is not an error; reads return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// a commit id (or branch) that the repository cannot resolve
    #[error("not found: {0}")]
    NotFound(String),

    /// key or value (de)serialization failed
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// a branch name that cannot be used as `refs/heads/<name>`
    #[error("invalid branch name: {0}")]
    InvalidBranch(InvalidNameError),

    /// a commit record field name outside the fixed schema
    #[error("unknown commit record field: {0}")]
    UnknownField(String),

    /// a commit record date that is not ISO-8601
    #[error("invalid timestamp in {field}: {reason}")]
    InvalidTimestamp { field: &'static str, reason: String },

    /// any failure from the git engine
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl StoreError {
    /// check if this error indicates the commit or branch doesn't exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// check if stored content could not be decoded
    pub fn is_encoding(&self) -> bool {
        matches!(self, StoreError::Codec(CodecError::Decode { .. } | CodecError::Encode { .. }))
    }

    /// check if a write lost a race with another writer
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, StoreError::Storage(e) if e.is_retriable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(StoreError::NotFound("abc".into()).is_not_found());
        assert!(StoreError::from(StorageError::RefNotFound("master".into())).is_not_found());

        let decode = StoreError::from(CodecError::Decode {
            format: "yaml",
            reason: "bad".into(),
        });
        assert!(decode.is_encoding());
        assert!(!decode.is_not_found());

        let race = StoreError::from(StorageError::ConcurrentModification {
            branch: "master".into(),
        });
        assert!(race.is_concurrent_modification());
        assert!(!StoreError::UnknownField("x".into()).is_concurrent_modification());
    }
}
