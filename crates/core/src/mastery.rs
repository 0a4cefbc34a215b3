//! Mastery model - per-topic knowledge tracing state.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::id::TopicId;

/// Lowest self-tuned difficulty level.
pub const MIN_DIFFICULTY: u8 = 1;

/// Highest self-tuned difficulty level.
pub const MAX_DIFFICULTY: u8 = 5;

/// Knowledge tracing state for one topic.
///
/// Deserialization rejects records that break the invariants below, so a
/// hand-edited or damaged store fails to load instead of skewing estimates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMasteryRecord")]
pub struct TopicMasteryRecord {
    /// Probability the topic is mastered, a finite value in `[0, 1]`; the
    /// estimator keeps it within its configured floor and ceiling
    pub p_known: f64,

    /// Recorded responses
    pub attempts: u32,

    /// Correct responses, never more than `attempts`
    pub correct: u32,

    /// Difficulty level in `1..=5`
    pub difficulty: u8,
}

impl TopicMasteryRecord {
    /// A never-practiced topic.
    pub fn new(p_init: f64) -> Self {
        Self {
            p_known: p_init,
            attempts: 0,
            correct: 0,
            difficulty: MIN_DIFFICULTY,
        }
    }

    /// Fraction of attempts answered correctly (0 when never attempted).
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempts as f64
        }
    }

    /// Classify the record against a mastery threshold.
    pub fn status(&self, mastery_threshold: f64) -> MasteryStatus {
        if self.p_known >= mastery_threshold {
            MasteryStatus::Mastered
        } else if self.attempts > 0 {
            MasteryStatus::InProgress
        } else {
            MasteryStatus::NotStarted
        }
    }
}

impl Default for TopicMasteryRecord {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// On-disk form of a record, before its invariants are checked.
#[derive(Deserialize)]
#[serde(default)]
struct RawMasteryRecord {
    p_known: f64,
    attempts: u32,
    correct: u32,
    difficulty: u8,
}

impl Default for RawMasteryRecord {
    fn default() -> Self {
        let record = TopicMasteryRecord::default();
        Self {
            p_known: record.p_known,
            attempts: record.attempts,
            correct: record.correct,
            difficulty: record.difficulty,
        }
    }
}

impl TryFrom<RawMasteryRecord> for TopicMasteryRecord {
    type Error = String;

    fn try_from(raw: RawMasteryRecord) -> Result<Self, Self::Error> {
        if !(0.0..=1.0).contains(&raw.p_known) {
            return Err(format!("p_known must be within [0, 1], got {}", raw.p_known));
        }
        if raw.correct > raw.attempts {
            return Err(format!(
                "correct ({}) exceeds attempts ({})",
                raw.correct, raw.attempts
            ));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&raw.difficulty) {
            return Err(format!(
                "difficulty must be within {MIN_DIFFICULTY}..={MAX_DIFFICULTY}, got {}",
                raw.difficulty
            ));
        }
        Ok(Self {
            p_known: raw.p_known,
            attempts: raw.attempts,
            correct: raw.correct,
            difficulty: raw.difficulty,
        })
    }
}

/// Coarse mastery classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryStatus {
    /// At or above the mastery threshold
    Mastered,
    /// Practiced but not yet mastered
    InProgress,
    /// Never practiced
    NotStarted,
}

impl MasteryStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryStatus::Mastered => "mastered",
            MasteryStatus::InProgress => "in_progress",
            MasteryStatus::NotStarted => "not_started",
        }
    }
}

/// Persisted mastery store.
///
/// The file is shared with other study tooling, so top-level keys other than
/// `topics` are carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasteryStore {
    /// Records by topic
    #[serde(default)]
    pub topics: BTreeMap<TopicId, TopicMasteryRecord>,

    /// Unrecognized top-level fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MasteryStore {
    /// Look up a topic's record.
    pub fn get(&self, topic: &TopicId) -> Option<&TopicMasteryRecord> {
        self.topics.get(topic)
    }

    /// Get a topic's record, inserting a fresh one first if absent.
    ///
    /// Returns a copy of the record and whether it was just created.
    pub fn get_or_create(&mut self, topic: &TopicId, p_init: f64) -> (TopicMasteryRecord, bool) {
        match self.topics.get(topic) {
            Some(record) => (*record, false),
            None => {
                let record = TopicMasteryRecord::new(p_init);
                self.topics.insert(topic.clone(), record);
                (record, true)
            }
        }
    }

    /// Replace a topic's record.
    pub fn insert(&mut self, topic: TopicId, record: TopicMasteryRecord) {
        self.topics.insert(topic, record);
    }

    /// Number of known topics.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether no topic is known.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
