//! Store error types.

use thiserror::Error;

/// Convenience alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the persistence collaborator.
///
/// Reads never surface these: a corrupt or missing document falls back to
/// its schema default with a warning. Writes do, so callers can log the
/// degrade — though a failed persist never aborts the hook chain either.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
