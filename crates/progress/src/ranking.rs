//! Study priority ranking over mastery and schedule state.

use std::collections::BTreeSet;
use std::sync::Arc;
use serde::Serialize;
use tracing::debug;
use tutor_core::{TopicId, TopicMasteryRecord};
use tutor_storage::Storage;
use crate::clock::Clock;
use crate::error::Result;

/// Score for a topic with no mastery record.
pub const UNTRACKED_SCORE: f64 = 50.0;

/// Added when a topic keeps being answered wrong.
pub const STRUGGLE_BONUS: f64 = 50.0;

/// Added for topics the caller asked to boost.
pub const MANUAL_BOOST: f64 = 50.0;

const STRUGGLE_MIN_ATTEMPTS: u32 = 3;
const STRUGGLE_MASTERY: f64 = 0.4;
const FLAG_MASTERY: f64 = 0.5;

/// Priority of a topic; higher means study sooner.
pub fn priority_score(record: Option<&TopicMasteryRecord>, boosted: bool) -> f64 {
    let Some(record) = record else {
        return UNTRACKED_SCORE;
    };

    let mut score = (1.0 - record.p_known) * 100.0;
    if record.attempts >= STRUGGLE_MIN_ATTEMPTS && record.p_known < STRUGGLE_MASTERY {
        score += STRUGGLE_BONUS;
    }
    if boosted {
        score += MANUAL_BOOST;
    }
    score
}

/// Advice on whether a topic should be flagged for extra attention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagAdvice {
    /// Whether to flag
    pub flag: bool,
    /// Why
    pub reason: String,
}

/// Flag a topic that has had enough attempts and is still weak.
pub fn should_flag(record: Option<&TopicMasteryRecord>) -> FlagAdvice {
    match record {
        None => FlagAdvice {
            flag: false,
            reason: "No mastery data yet".to_string(),
        },
        Some(r) if r.p_known < FLAG_MASTERY && r.attempts >= STRUGGLE_MIN_ATTEMPTS => FlagAdvice {
            flag: true,
            reason: format!(
                "Mastery {:.1}% after {} attempts",
                r.p_known * 100.0,
                r.attempts
            ),
        },
        Some(r) => FlagAdvice {
            flag: false,
            reason: format!("Mastery {:.1}% is on track", r.p_known * 100.0),
        },
    }
}

/// One ranked topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTopic {
    /// Topic
    pub topic: TopicId,
    /// Priority score
    pub score: f64,
    /// P(known), if the topic has a mastery record
    pub p_known: Option<f64>,
    /// Attempts so far
    pub attempts: u32,
    /// Whether a review is due now
    pub due: bool,
    /// Whether the caller boosted it
    pub boosted: bool,
}

/// Ranks every known topic by study priority. Never writes.
pub struct PriorityRanker<S: Storage> {
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Storage> PriorityRanker<S> {
    /// Create a ranker.
    pub fn new(storage: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Topics from either store, plus any boosted ones, highest score first.
    pub async fn rank(&self, boosted: &[TopicId]) -> Result<Vec<RankedTopic>> {
        let mastery = self.storage.load_mastery().await?;
        let schedule = self.storage.load_schedule().await?;
        let now = self.clock.now();
        let boosted: BTreeSet<&TopicId> = boosted.iter().collect();

        let topics: BTreeSet<&TopicId> = mastery
            .topics
            .keys()
            .chain(schedule.topics.keys())
            .chain(boosted.iter().copied())
            .collect();

        let mut ranked: Vec<RankedTopic> = topics
            .into_iter()
            .map(|topic| {
                let record = mastery.get(topic);
                let is_boosted = boosted.contains(topic);
                RankedTopic {
                    topic: topic.clone(),
                    score: priority_score(record, is_boosted),
                    p_known: record.map(|r| r.p_known),
                    attempts: record.map_or(0, |r| r.attempts),
                    due: schedule.get(topic).is_some_and(|r| r.is_due(now)),
                    boosted: is_boosted,
                }
            })
            .collect();

        // Stable, so equal scores stay in topic id order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!(topics = ranked.len(), "ranked topics");
        Ok(ranked)
    }
}
