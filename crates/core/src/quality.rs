//! Review quality ratings and answer correctness input.

use serde::{Deserialize, Serialize};
use crate::error::ValidationError;

/// Self-assessed recall quality for a review, always within `0..=5`.
///
/// - 0: complete blackout
/// - 1: incorrect, but recognized the answer
/// - 2: incorrect, but the answer seemed easy
/// - 3: correct with serious difficulty
/// - 4: correct after hesitation
/// - 5: perfect recall
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Highest rating.
    pub const MAX: u8 = 5;

    /// Lowest rating that counts as a successful recall.
    pub const PASS: u8 = 3;

    /// Validate a raw rating.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::QualityOutOfRange(value))
        }
    }

    /// The rating as a number.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether the rating counts as a successful recall (`>= 3`).
    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASS
    }
}

impl TryFrom<i64> for Quality {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Parse a textual answer outcome into a definite boolean.
///
/// Accepts `true`, `1`, `yes`, `correct` and `false`, `0`, `no`,
/// `incorrect`, `wrong` (case-insensitive). Anything else is rejected rather
/// than silently read as incorrect.
pub fn parse_correctness(raw: &str) -> Result<bool, ValidationError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "correct" => Ok(true),
        "false" | "0" | "no" | "incorrect" | "wrong" => Ok(false),
        _ => Err(ValidationError::InvalidCorrectness(raw.to_string())),
    }
}
