//! Schedule model - per-topic spaced-repetition state.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::id::TopicId;
use crate::quality::Quality;
use crate::Time;

/// Scheduling state for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicScheduleRecord {
    /// Interval growth multiplier, never below the configured floor
    pub ease_factor: f64,

    /// Current interval in days
    pub interval: f64,

    /// Consecutive successful reviews since the last failure
    pub repetitions: u32,

    /// When the topic is next due
    #[serde(with = "crate::time::iso8601")]
    pub next_review: Time,

    /// When the topic was last reviewed
    #[serde(default, with = "crate::time::iso8601::option")]
    pub last_review: Option<Time>,

    /// Reviews ever recorded, never reset
    #[serde(default)]
    pub total_reviews: u32,

    /// Most recent ratings, oldest first
    #[serde(default)]
    pub quality_history: Vec<QualityEntry>,
}

/// One retained review rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityEntry {
    /// Rating given
    pub quality: Quality,

    /// When it was given
    #[serde(with = "crate::time::iso8601")]
    pub timestamp: Time,
}

impl TopicScheduleRecord {
    /// A never-reviewed topic, due immediately.
    pub fn new(default_ease: f64, now: Time) -> Self {
        Self {
            ease_factor: default_ease,
            interval: 0.0,
            repetitions: 0,
            next_review: now,
            last_review: None,
            total_reviews: 0,
            quality_history: Vec::new(),
        }
    }

    /// Append a rating, evicting the oldest so at most `limit` remain.
    pub fn push_history(&mut self, entry: QualityEntry, limit: usize) {
        self.quality_history.push(entry);
        if self.quality_history.len() > limit {
            let excess = self.quality_history.len() - limit;
            self.quality_history.drain(..excess);
        }
    }

    /// Mean of the retained ratings (0 when there are none).
    pub fn average_quality(&self) -> f64 {
        if self.quality_history.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.quality_history.iter().map(|e| e.quality.value() as u32).sum();
        sum as f64 / self.quality_history.len() as f64
    }

    /// The last `n` ratings, oldest first.
    pub fn recent_quality(&self, n: usize) -> Vec<u8> {
        let start = self.quality_history.len().saturating_sub(n);
        self.quality_history[start..].iter().map(|e| e.quality.value()).collect()
    }

    /// Whether the topic is due at `now`.
    pub fn is_due(&self, now: Time) -> bool {
        self.next_review <= now
    }
}

/// Persisted schedule store: a flat mapping from topic to record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleStore {
    /// Records by topic
    pub topics: BTreeMap<TopicId, TopicScheduleRecord>,
}

impl ScheduleStore {
    /// Look up a topic's record.
    pub fn get(&self, topic: &TopicId) -> Option<&TopicScheduleRecord> {
        self.topics.get(topic)
    }

    /// Get a topic's record, inserting a fresh one first if absent.
    ///
    /// Returns a copy of the record and whether it was just created.
    pub fn get_or_create(
        &mut self,
        topic: &TopicId,
        default_ease: f64,
        now: Time,
    ) -> (TopicScheduleRecord, bool) {
        if let Some(record) = self.topics.get(topic) {
            return (record.clone(), false);
        }
        let record = TopicScheduleRecord::new(default_ease, now);
        self.topics.insert(topic.clone(), record.clone());
        (record, true)
    }

    /// Replace a topic's record.
    pub fn insert(&mut self, topic: TopicId, record: TopicScheduleRecord) {
        self.topics.insert(topic, record);
    }

    /// Delete a topic's record, returning it if it existed.
    pub fn remove(&mut self, topic: &TopicId) -> Option<TopicScheduleRecord> {
        self.topics.remove(topic)
    }

    /// Number of scheduled topics.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn at(minutes: i64) -> Time {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn entry(q: i64, minutes: i64) -> QualityEntry {
        QualityEntry { quality: Quality::new(q).unwrap(), timestamp: at(minutes) }
    }

    #[test]
    fn test_history_is_capped_oldest_first() {
        let mut record = TopicScheduleRecord::new(2.5, at(0));
        for i in 0..25 {
            record.push_history(entry(i % 6, i), 20);
        }
        assert_eq!(record.quality_history.len(), 20);
        assert_eq!(record.quality_history[0].timestamp, at(5));
        assert_eq!(record.quality_history[19].timestamp, at(24));
    }

    #[test]
    fn test_average_and_recent_quality() {
        let mut record = TopicScheduleRecord::new(2.5, at(0));
        assert_eq!(record.average_quality(), 0.0);
        assert!(record.recent_quality(5).is_empty());

        for (i, q) in [5, 4, 3, 2, 1, 0].into_iter().enumerate() {
            record.push_history(entry(q, i as i64), 20);
        }
        assert!((record.average_quality() - 2.5).abs() < 1e-9);
        assert_eq!(record.recent_quality(5), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_store_round_trips_flat_mapping() {
        let raw = r#"{
            "paging": {
                "ease_factor": 2.6,
                "interval": 1.02,
                "repetitions": 1,
                "next_review": "2024-01-02T09:30:00",
                "last_review": null,
                "total_reviews": 1,
                "quality_history": [{"quality": 5, "timestamp": "2024-01-01T09:30:00"}]
            }
        }"#;
        let store: ScheduleStore = serde_json::from_str(raw).unwrap();
        let record = store.get(&TopicId::new("paging")).unwrap();
        assert_eq!(record.repetitions, 1);
        assert!(record.last_review.is_none());
        assert_eq!(record.quality_history[0].quality.value(), 5);

        let json = serde_json::to_value(&store).unwrap();
        assert!(json["paging"]["last_review"].is_null());
        assert_eq!(json["paging"]["quality_history"][0]["quality"], 5);
    }

    #[test]
    fn test_store_rejects_invalid_quality() {
        let raw = r#"{
            "paging": {
                "ease_factor": 2.5, "interval": 0, "repetitions": 0,
                "next_review": "2024-01-02T09:30:00Z", "last_review": null,
                "total_reviews": 1,
                "quality_history": [{"quality": 7, "timestamp": "2024-01-01T09:30:00Z"}]
            }
        }"#;
        assert!(serde_json::from_str::<ScheduleStore>(raw).is_err());
    }

    #[test]
    fn test_remove_then_recreate_defaults() {
        let mut store = ScheduleStore::default();
        let topic = TopicId::new("tlb");
        let (mut record, _) = store.get_or_create(&topic, 2.5, at(0));
        record.total_reviews = 3;
        store.insert(topic.clone(), record);

        assert!(store.remove(&topic).is_some());
        let (fresh, created) = store.get_or_create(&topic, 2.5, at(10));
        assert!(created);
        assert_eq!(fresh.total_reviews, 0);
        assert_eq!(fresh.next_review, at(10));
    }
}
