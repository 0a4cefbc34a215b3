//! Input validation errors.

/// A caller-supplied input violated an operation's precondition.
///
/// Validation always happens before any record is touched, so an operation
/// that returns one of these has not changed any stored state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Quality rating outside `0..=5`
    #[error("quality must be between 0 and 5, got {0}")]
    QualityOutOfRange(i64),

    /// Correctness input that is neither clearly true nor clearly false
    #[error(
        "correctness must be one of true/1/yes/correct or false/0/no/incorrect/wrong, got {0:?}"
    )]
    InvalidCorrectness(String),

    /// Empty or whitespace-only topic id
    #[error("topic id must not be empty")]
    BlankTopic,
}
