//! Mastery estimation service.

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tutor_core::{
    parse_correctness, BktParams, MasteryStatus, TopicId, TopicMasteryRecord, ValidationError,
};
use tutor_storage::Storage;
use crate::bkt;
use crate::error::Result;

/// Mastery below which a suggestion is reported as low mastery.
const LOW_MASTERY: f64 = 0.5;

/// Attempts below which a suggestion is reported as under-practiced.
const FEW_ATTEMPTS: u32 = 3;

/// Result of recording one answer.
#[derive(Debug, Clone, Serialize)]
pub struct MasteryUpdate {
    /// Topic answered
    pub topic: TopicId,
    /// P(known) before the answer
    pub old_mastery: f64,
    /// P(known) after the answer
    pub new_mastery: f64,
    /// `new_mastery - old_mastery`
    pub change: f64,
    /// Whether the topic is now at or above the mastery threshold
    pub mastered: bool,
    /// Attempts so far
    pub attempts: u32,
    /// Fraction answered correctly
    pub success_rate: f64,
    /// Difficulty after tuning
    pub difficulty: u8,
    /// The stored record
    #[serde(skip)]
    pub record: TopicMasteryRecord,
}

/// Read view of one topic's mastery.
#[derive(Debug, Clone, Serialize)]
pub struct MasteryView {
    /// Topic
    pub topic: TopicId,
    /// P(known)
    pub p_known: f64,
    /// At or above the mastery threshold
    pub mastered: bool,
    /// Attempts so far
    pub attempts: u32,
    /// Correct answers so far
    pub correct: u32,
    /// Fraction answered correctly (0 when never attempted)
    pub success_rate: f64,
    /// Current difficulty
    pub difficulty: u8,
}

/// Aggregate mastery over all known topics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// Known topics
    pub total_topics: usize,
    /// Topics at or above the threshold
    pub mastered: usize,
    /// Practiced, not yet mastered
    pub in_progress: usize,
    /// Never practiced
    pub not_started: usize,
    /// Per-topic summary
    pub topics: BTreeMap<TopicId, TopicStatus>,
}

/// Per-topic line of a [`StatusReport`].
#[derive(Debug, Clone, Serialize)]
pub struct TopicStatus {
    /// P(known)
    pub p_known: f64,
    /// Classification
    pub status: MasteryStatus,
    /// Attempts so far
    pub attempts: u32,
}

/// What to study next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "suggestion", rename_all = "snake_case")]
pub enum Suggestion {
    /// Study this topic
    Study {
        /// Weakest unmastered topic
        topic: TopicId,
        /// Its P(known)
        mastery: f64,
        /// Its attempts
        attempts: u32,
        /// Why it was picked
        reason: SuggestReason,
        /// Human-readable reason
        message: String,
    },
    /// Every tracked topic is mastered (or nothing is tracked)
    AllMastered,
}

/// Band a suggestion falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestReason {
    /// P(known) below 0.5
    LowMastery,
    /// Fewer than three attempts
    FewAttempts,
    /// Moderate mastery, approaching proficiency
    ApproachingProficiency,
}

impl SuggestReason {
    /// Pick the band for a candidate.
    pub fn classify(mastery: f64, attempts: u32) -> Self {
        if mastery < LOW_MASTERY {
            SuggestReason::LowMastery
        } else if attempts < FEW_ATTEMPTS {
            SuggestReason::FewAttempts
        } else {
            SuggestReason::ApproachingProficiency
        }
    }

    /// Human-readable reason.
    pub fn describe(&self, mastery: f64, attempts: u32) -> String {
        match self {
            SuggestReason::LowMastery => {
                format!("Low mastery ({:.1}%) - needs focused practice", mastery * 100.0)
            }
            SuggestReason::FewAttempts => {
                format!("Few attempts ({attempts}) - needs more practice")
            }
            SuggestReason::ApproachingProficiency => {
                format!("Moderate mastery ({:.1}%) - approaching proficiency", mastery * 100.0)
            }
        }
    }
}

/// Knowledge tracing over a mastery store.
///
/// Every mutating operation loads the store, updates one record and writes
/// the store back while holding `writer`, so concurrent answers for the same
/// store are applied one after another instead of overwriting each other.
pub struct MasteryEstimator<S: Storage> {
    storage: Arc<S>,
    params: BktParams,
    writer: Mutex<()>,
}

impl<S: Storage> MasteryEstimator<S> {
    /// Create an estimator with the given parameters.
    pub fn new(storage: Arc<S>, params: BktParams) -> Self {
        Self {
            storage,
            params,
            writer: Mutex::new(()),
        }
    }

    /// The parameters in use.
    pub fn params(&self) -> &BktParams {
        &self.params
    }

    /// Record one answer for a topic.
    pub async fn update(&self, topic: &TopicId, is_correct: bool) -> Result<MasteryUpdate> {
        if topic.is_blank() {
            warn!("rejecting answer: blank topic id");
            return Err(ValidationError::BlankTopic.into());
        }

        let _guard = self.writer.lock().await;
        let mut store = self.storage.load_mastery().await?;
        let (old, _) = store.get_or_create(topic, self.params.p_init);
        let new = bkt::apply_answer(&self.params, &old, is_correct);
        store.insert(topic.clone(), new);
        self.storage.save_mastery(&store).await?;

        info!(
            "{} answered {}: mastery {:.3} -> {:.3}",
            topic,
            if is_correct { "correctly" } else { "incorrectly" },
            old.p_known,
            new.p_known
        );

        Ok(MasteryUpdate {
            topic: topic.clone(),
            old_mastery: old.p_known,
            new_mastery: new.p_known,
            change: new.p_known - old.p_known,
            mastered: new.p_known >= self.params.mastery_threshold,
            attempts: new.attempts,
            success_rate: new.success_rate(),
            difficulty: new.difficulty,
            record: new,
        })
    }

    /// Record one answer given as text (`true`/`false`, `yes`/`no`, ...).
    pub async fn update_from_str(&self, topic: &TopicId, raw: &str) -> Result<MasteryUpdate> {
        let is_correct = parse_correctness(raw).inspect_err(|e| warn!("rejecting answer: {e}"))?;
        self.update(topic, is_correct).await
    }

    /// Current mastery for a topic, creating a default record if it is new.
    pub async fn get(&self, topic: &TopicId) -> Result<MasteryView> {
        if topic.is_blank() {
            return Err(ValidationError::BlankTopic.into());
        }

        let record = match self.storage.load_mastery().await?.get(topic) {
            Some(record) => *record,
            None => self.create(topic).await?,
        };

        Ok(self.view(topic, &record))
    }

    /// Insert a default record unless one appeared since the caller looked.
    async fn create(&self, topic: &TopicId) -> Result<TopicMasteryRecord> {
        let _guard = self.writer.lock().await;
        let mut store = self.storage.load_mastery().await?;
        let (record, created) = store.get_or_create(topic, self.params.p_init);
        if created {
            self.storage.save_mastery(&store).await?;
            info!("started tracking {}", topic);
        }
        Ok(record)
    }

    fn view(&self, topic: &TopicId, record: &TopicMasteryRecord) -> MasteryView {
        MasteryView {
            topic: topic.clone(),
            p_known: record.p_known,
            mastered: record.p_known >= self.params.mastery_threshold,
            attempts: record.attempts,
            correct: record.correct,
            success_rate: record.success_rate(),
            difficulty: record.difficulty,
        }
    }

    /// Counts of mastered, in-progress and not-started topics.
    pub async fn status(&self) -> Result<StatusReport> {
        let store = self.storage.load_mastery().await?;
        let mut report = StatusReport {
            total_topics: store.len(),
            ..Default::default()
        };

        for (topic, record) in &store.topics {
            let status = record.status(self.params.mastery_threshold);
            match status {
                MasteryStatus::Mastered => report.mastered += 1,
                MasteryStatus::InProgress => report.in_progress += 1,
                MasteryStatus::NotStarted => report.not_started += 1,
            }
            report.topics.insert(
                topic.clone(),
                TopicStatus {
                    p_known: record.p_known,
                    status,
                    attempts: record.attempts,
                },
            );
        }

        Ok(report)
    }

    /// The weakest unmastered topic, ties going to the one with fewer attempts.
    pub async fn suggest(&self) -> Result<Suggestion> {
        let store = self.storage.load_mastery().await?;
        let threshold = self.params.mastery_threshold;

        let weakest = store
            .topics
            .iter()
            .filter(|(_, r)| r.p_known < threshold)
            .min_by(|(_, a), (_, b)| {
                a.p_known
                    .total_cmp(&b.p_known)
                    .then(a.attempts.cmp(&b.attempts))
            });

        let Some((topic, record)) = weakest else {
            return Ok(Suggestion::AllMastered);
        };

        let reason = SuggestReason::classify(record.p_known, record.attempts);
        Ok(Suggestion::Study {
            topic: topic.clone(),
            mastery: record.p_known,
            attempts: record.attempts,
            reason,
            message: reason.describe(record.p_known, record.attempts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::{EngineConfig, MasteryStore, ScheduleStore};
    use tutor_storage::MemoryStorage;
    use crate::error::EngineError;

    fn estimator() -> MasteryEstimator<MemoryStorage> {
        MasteryEstimator::new(Arc::new(MemoryStorage::new()), EngineConfig::default().bkt)
    }

    fn seeded(records: &[(&str, f64, u32)]) -> MasteryEstimator<MemoryStorage> {
        let mut store = MasteryStore::default();
        for (name, p_known, attempts) in records {
            store.insert(
                TopicId::new(*name),
                TopicMasteryRecord {
                    p_known: *p_known,
                    attempts: *attempts,
                    correct: 0,
                    difficulty: 1,
                },
            );
        }
        let storage = MemoryStorage::with_stores(store, ScheduleStore::default());
        MasteryEstimator::new(Arc::new(storage), BktParams::default())
    }

    #[tokio::test]
    async fn test_first_correct_answer() {
        let estimator = estimator();
        let result = estimator.update(&TopicId::new("paging"), true).await.unwrap();

        assert!((result.old_mastery - 0.3).abs() < 1e-12);
        assert!((result.new_mastery - 0.6927).abs() < 1e-4);
        assert!((result.change - 0.3927).abs() < 1e-4);
        assert!(!result.mastered);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.success_rate, 1.0);
    }

    #[tokio::test]
    async fn test_first_incorrect_answer() {
        let estimator = estimator();
        let result = estimator.update(&TopicId::new("paging"), false).await.unwrap();
        assert!((result.new_mastery - 0.1457).abs() < 1e-4);
        assert_eq!(result.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_update_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let estimator = MasteryEstimator::new(storage.clone(), BktParams::default());
        let topic = TopicId::new("tlb");

        estimator.update(&topic, true).await.unwrap();
        estimator.update(&topic, false).await.unwrap();

        let store = storage.load_mastery().await.unwrap();
        let record = store.get(&topic).unwrap();
        assert_eq!(record.attempts, 2);
        assert_eq!(record.correct, 1);
    }

    #[tokio::test]
    async fn test_malformed_correctness_is_rejected_without_writing() {
        let storage = Arc::new(MemoryStorage::new());
        let estimator = MasteryEstimator::new(storage.clone(), BktParams::default());

        let err = estimator
            .update_from_str(&TopicId::new("paging"), "sort of")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::InvalidCorrectness(_))
        ));
        assert!(storage.load_mastery().await.unwrap().is_empty());

        let ok = estimator.update_from_str(&TopicId::new("paging"), "yes").await.unwrap();
        assert_eq!(ok.attempts, 1);
    }

    #[tokio::test]
    async fn test_blank_topic_is_rejected() {
        let estimator = estimator();
        assert!(matches!(
            estimator.update(&TopicId::new(" "), true).await,
            Err(EngineError::Validation(ValidationError::BlankTopic))
        ));
    }

    #[tokio::test]
    async fn test_get_creates_defaults_once() {
        let storage = Arc::new(MemoryStorage::new());
        let estimator = MasteryEstimator::new(storage.clone(), BktParams::default());
        let topic = TopicId::new("deadlock");

        let view = estimator.get(&topic).await.unwrap();
        assert_eq!(view.p_known, 0.3);
        assert_eq!(view.attempts, 0);
        assert_eq!(view.difficulty, 1);
        assert!(!view.mastered);

        let after_first = storage.load_mastery().await.unwrap();
        assert_eq!(after_first.len(), 1);

        // Repeated reads leave the store exactly as it was
        estimator.get(&topic).await.unwrap();
        estimator.status().await.unwrap();
        assert_eq!(storage.load_mastery().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_status_on_empty_store() {
        let report = estimator().status().await.unwrap();
        assert_eq!(report.total_topics, 0);
        assert_eq!(report.mastered + report.in_progress + report.not_started, 0);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let estimator = seeded(&[("a", 0.97, 9), ("b", 0.5, 2), ("c", 0.3, 0)]);
        let report = estimator.status().await.unwrap();
        assert_eq!(report.total_topics, 3);
        assert_eq!(report.mastered, 1);
        assert_eq!(report.in_progress, 1);
        assert_eq!(report.not_started, 1);
        assert_eq!(report.topics[&TopicId::new("b")].status, MasteryStatus::InProgress);
    }

    #[tokio::test]
    async fn test_suggest_prefers_lowest_mastery() {
        let estimator = seeded(&[("a", 0.2, 5), ("b", 0.6, 1)]);
        match estimator.suggest().await.unwrap() {
            Suggestion::Study { topic, reason, .. } => {
                assert_eq!(topic, TopicId::new("a"));
                assert_eq!(reason, SuggestReason::LowMastery);
            }
            other => panic!("unexpected suggestion: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_suggest_breaks_ties_on_attempts() {
        let estimator = seeded(&[("a", 0.6, 4), ("b", 0.6, 1)]);
        match estimator.suggest().await.unwrap() {
            Suggestion::Study { topic, reason, .. } => {
                assert_eq!(topic, TopicId::new("b"));
                assert_eq!(reason, SuggestReason::FewAttempts);
            }
            other => panic!("unexpected suggestion: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_suggest_approaching_proficiency() {
        let estimator = seeded(&[("a", 0.8, 6), ("b", 0.99, 10)]);
        match estimator.suggest().await.unwrap() {
            Suggestion::Study { topic, reason, message, .. } => {
                assert_eq!(topic, TopicId::new("a"));
                assert_eq!(reason, SuggestReason::ApproachingProficiency);
                assert!(message.contains("80.0%"));
            }
            other => panic!("unexpected suggestion: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_suggest_all_mastered() {
        assert_eq!(estimator().suggest().await.unwrap(), Suggestion::AllMastered);
        let estimator = seeded(&[("a", 0.96, 8)]);
        assert_eq!(estimator.suggest().await.unwrap(), Suggestion::AllMastered);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let storage = Arc::new(MemoryStorage::new());
        let estimator = Arc::new(MasteryEstimator::new(storage.clone(), BktParams::default()));
        let topic = TopicId::new("scheduling");

        let mut handles = Vec::new();
        for i in 0..20 {
            let estimator = estimator.clone();
            let topic = topic.clone();
            handles.push(tokio::spawn(async move {
                estimator.update(&topic, i % 2 == 0).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let store = storage.load_mastery().await.unwrap();
        let record = store.get(&topic).unwrap();
        assert_eq!(record.attempts, 20);
        assert_eq!(record.correct, 10);
    }
}
