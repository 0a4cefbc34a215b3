//! Engine error type.

use tutor_core::ValidationError;
use tutor_storage::StorageError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the engines.
///
/// Numeric degeneracies (a zero observation probability, a probability or
/// ease factor drifting out of bounds) are handled internally and never
/// reported here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Caller input rejected before any state was touched
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The persisted store could not be read or written
    #[error("store error: {0}")]
    Store(#[from] StorageError),
}
