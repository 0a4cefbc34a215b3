//! Review scheduling service.
//!
//! [`ReviewScheduler`] owns the schedule store. Reviews go through the SM-2
//! update in [`crate::sm2`]; everything else is a read over a snapshot of the
//! store taken at a single instant of the injected clock.

use std::sync::Arc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tutor_core::{
    Quality, ScheduleStore, Sm2Params, Time, TopicId, TopicScheduleRecord, ValidationError,
};
use tutor_storage::Storage;
use crate::clock::Clock;
use crate::error::Result;
use crate::noise::{NoiseSource, SeededNoise};
use crate::sm2;

/// Ratings included in [`TopicStats::recent_quality`].
const RECENT_QUALITY_COUNT: usize = 5;

/// Result of recording one review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    /// Topic reviewed
    pub topic: TopicId,
    /// Rating given
    pub quality: Quality,
    /// Ease factor after the review
    pub ease_factor: f64,
    /// Interval until the next review, jitter included
    pub interval_days: f64,
    /// When the topic is next due
    pub next_review: Time,
    /// Consecutive successes
    pub repetitions: u32,
    /// Reviews ever recorded
    pub total_reviews: u32,
}

/// A topic and when it is due.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTopic {
    /// Topic
    pub topic: TopicId,
    /// Due time
    pub next_review: Time,
}

/// Whether a topic's review time has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Due time strictly in the past
    Overdue,
    /// Due now or later
    Upcoming,
}

/// Derived view of one topic's schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStats {
    /// Topic
    pub topic: TopicId,
    /// Ease factor
    pub ease_factor: f64,
    /// Current interval in days
    pub current_interval_days: f64,
    /// Consecutive successes
    pub repetitions: u32,
    /// Reviews ever recorded
    pub total_reviews: u32,
    /// Mean of the retained ratings
    pub average_quality: f64,
    /// When the topic is next due
    pub next_review: Time,
    /// Days until due, negative when overdue
    pub days_until_review: f64,
    /// Overdue or upcoming
    pub status: ReviewState,
    /// When the topic was last reviewed
    pub last_review: Option<Time>,
    /// Last few ratings, oldest first
    pub recent_quality: Vec<u8>,
}

impl TopicStats {
    fn from_record(topic: &TopicId, record: &TopicScheduleRecord, now: Time) -> Self {
        let days_until_review = sm2::days_between(now, record.next_review);
        Self {
            topic: topic.clone(),
            ease_factor: record.ease_factor,
            current_interval_days: record.interval,
            repetitions: record.repetitions,
            total_reviews: record.total_reviews,
            average_quality: record.average_quality(),
            next_review: record.next_review,
            days_until_review,
            status: if days_until_review < 0.0 {
                ReviewState::Overdue
            } else {
                ReviewState::Upcoming
            },
            last_review: record.last_review,
            recent_quality: record.recent_quality(RECENT_QUALITY_COUNT),
        }
    }
}

/// Which part of the review queue an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePriority {
    /// From the due list
    Overdue,
    /// From the upcoming window
    Upcoming,
}

/// One entry of the review queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    /// Queue group
    pub priority: QueuePriority,
    /// Schedule view
    #[serde(flatten)]
    pub stats: TopicStats,
}

/// SM-2 scheduler over a schedule store.
///
/// The noise source sits behind the same lock that serializes writes, so
/// a seeded source yields the same jitter sequence for the same sequence of
/// reviews.
pub struct ReviewScheduler<S: Storage, N: NoiseSource = SeededNoise> {
    storage: Arc<S>,
    params: Sm2Params,
    clock: Arc<dyn Clock>,
    noise: Mutex<N>,
}

impl<S: Storage, N: NoiseSource> ReviewScheduler<S, N> {
    /// Create a scheduler.
    pub fn new(storage: Arc<S>, params: Sm2Params, clock: Arc<dyn Clock>, noise: N) -> Self {
        Self {
            storage,
            params,
            clock,
            noise: Mutex::new(noise),
        }
    }

    /// The parameters in use.
    pub fn params(&self) -> &Sm2Params {
        &self.params
    }

    /// Record a review rated `quality` (0-5).
    pub async fn review(&self, topic: &TopicId, quality: i64) -> Result<ReviewOutcome> {
        if topic.is_blank() {
            warn!("rejecting review: blank topic id");
            return Err(ValidationError::BlankTopic.into());
        }
        let quality =
            Quality::new(quality).inspect_err(|e| warn!("rejecting review of {topic}: {e}"))?;

        let mut noise = self.noise.lock().await;
        let now = self.clock.now();
        let mut store = self.storage.load_schedule().await?;
        let (record, _) = store.get_or_create(topic, self.params.default_ease, now);

        let jitter = noise.sample(self.params.noise_fraction);
        let next = sm2::apply_review(&self.params, &record, quality, now, jitter);
        store.insert(topic.clone(), next.clone());
        self.storage.save_schedule(&store).await?;
        drop(noise);

        info!(
            "{} reviewed with quality {}: next review in {:.2} days",
            topic, quality, next.interval
        );

        Ok(ReviewOutcome {
            topic: topic.clone(),
            quality,
            ease_factor: next.ease_factor,
            interval_days: next.interval,
            next_review: next.next_review,
            repetitions: next.repetitions,
            total_reviews: next.total_reviews,
        })
    }

    /// Topics due now, most overdue first.
    pub async fn due(&self, limit: Option<usize>) -> Result<Vec<ScheduledTopic>> {
        let store = self.storage.load_schedule().await?;
        Ok(due_in(&store, self.clock.now(), limit))
    }

    /// Topics coming due within the next `days`, soonest first.
    pub async fn upcoming(&self, days: f64, limit: Option<usize>) -> Result<Vec<ScheduledTopic>> {
        let store = self.storage.load_schedule().await?;
        Ok(upcoming_in(&store, self.clock.now(), days, limit))
    }

    /// The most overdue topic, if any.
    pub async fn next(&self) -> Result<Option<ScheduledTopic>> {
        Ok(self.due(Some(1)).await?.into_iter().next())
    }

    /// Schedule details for a known topic. Unknown topics yield `None`.
    pub async fn stats(&self, topic: &TopicId) -> Result<Option<TopicStats>> {
        let store = self.storage.load_schedule().await?;
        let now = self.clock.now();
        Ok(store.get(topic).map(|record| TopicStats::from_record(topic, record, now)))
    }

    /// Forget a topic's schedule. Returns whether there was one.
    pub async fn reset(&self, topic: &TopicId) -> Result<bool> {
        let _guard = self.noise.lock().await;
        let mut store = self.storage.load_schedule().await?;
        if store.remove(topic).is_none() {
            return Ok(false);
        }
        self.storage.save_schedule(&store).await?;
        info!("reset schedule for {}", topic);
        Ok(true)
    }

    /// Due topics followed by those coming up within the upcoming window,
    /// at most `limit` in total.
    pub async fn queue(&self, limit: usize) -> Result<Vec<QueueEntry>> {
        let store = self.storage.load_schedule().await?;
        let now = self.clock.now();

        let overdue = due_in(&store, now, Some(limit));
        let remaining = limit - overdue.len();
        let upcoming = if remaining > 0 {
            upcoming_in(&store, now, self.params.upcoming_window_days, Some(remaining))
        } else {
            Vec::new()
        };

        let tagged = overdue
            .into_iter()
            .map(|t| (QueuePriority::Overdue, t))
            .chain(upcoming.into_iter().map(|t| (QueuePriority::Upcoming, t)));

        Ok(tagged
            .filter_map(|(priority, t)| {
                store.get(&t.topic).map(|record| QueueEntry {
                    priority,
                    stats: TopicStats::from_record(&t.topic, record, now),
                })
            })
            .collect())
    }
}

fn due_in(store: &ScheduleStore, now: Time, limit: Option<usize>) -> Vec<ScheduledTopic> {
    collect_sorted(store, |r| r.is_due(now), limit)
}

fn upcoming_in(
    store: &ScheduleStore,
    now: Time,
    days: f64,
    limit: Option<usize>,
) -> Vec<ScheduledTopic> {
    let horizon = sm2::add_days(now, days);
    collect_sorted(store, |r| r.next_review > now && r.next_review <= horizon, limit)
}

/// Matching topics by ascending due time; equal times keep topic id order.
fn collect_sorted(
    store: &ScheduleStore,
    keep: impl Fn(&TopicScheduleRecord) -> bool,
    limit: Option<usize>,
) -> Vec<ScheduledTopic> {
    let mut topics: Vec<ScheduledTopic> = store
        .topics
        .iter()
        .filter(|(_, r)| keep(r))
        .map(|(topic, r)| ScheduledTopic {
            topic: topic.clone(),
            next_review: r.next_review,
        })
        .collect();
    topics.sort_by_key(|t| t.next_review);
    if let Some(limit) = limit {
        topics.truncate(limit);
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tutor_storage::MemoryStorage;
    use crate::clock::FixedClock;
    use crate::error::EngineError;
    use crate::noise::{ConstantNoise, ZeroNoise};

    fn start() -> Time {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    struct Fixture {
        storage: Arc<MemoryStorage>,
        clock: Arc<FixedClock>,
        scheduler: ReviewScheduler<MemoryStorage, ZeroNoise>,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(FixedClock::new(start()));
        let scheduler = ReviewScheduler::new(
            storage.clone(),
            Sm2Params::default(),
            clock.clone(),
            ZeroNoise,
        );
        Fixture { storage, clock, scheduler }
    }

    fn topic(name: &str) -> TopicId {
        TopicId::new(name)
    }

    #[tokio::test]
    async fn test_review_sequence() {
        let f = fixture();
        let t = topic("paging");

        let first = f.scheduler.review(&t, 4).await.unwrap();
        assert_eq!(first.repetitions, 1);
        assert_eq!(first.interval_days, 1.0);
        assert_eq!(first.next_review, start() + Duration::days(1));
        assert!((first.ease_factor - 2.5).abs() < 1e-12);

        let second = f.scheduler.review(&t, 4).await.unwrap();
        assert_eq!(second.interval_days, 6.0);

        let third = f.scheduler.review(&t, 5).await.unwrap();
        assert!((third.interval_days - 15.6).abs() < 1e-9);
        assert_eq!(third.total_reviews, 3);

        let failed = f.scheduler.review(&t, 2).await.unwrap();
        assert_eq!(failed.repetitions, 0);
        assert_eq!(failed.interval_days, 1.0);
        assert_eq!(failed.total_reviews, 4);
    }

    #[tokio::test]
    async fn test_quality_out_of_range_writes_nothing() {
        let f = fixture();
        for bad in [-1, 6, 42] {
            let err = f.scheduler.review(&topic("paging"), bad).await.unwrap_err();
            assert!(matches!(
                err,
                EngineError::Validation(ValidationError::QualityOutOfRange(q)) if q == bad
            ));
        }
        assert!(f.storage.load_schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jitter_is_applied() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(FixedClock::new(start()));
        let scheduler =
            ReviewScheduler::new(storage, Sm2Params::default(), clock, ConstantNoise(0.05));

        let outcome = scheduler.review(&topic("tlb"), 5).await.unwrap();
        assert!((outcome.interval_days - 1.05).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_seeded_noise_stays_within_band_and_repeats() {
        async fn intervals(seed: u64) -> Vec<f64> {
            let scheduler = ReviewScheduler::new(
                Arc::new(MemoryStorage::new()),
                Sm2Params::default(),
                Arc::new(FixedClock::new(start())),
                SeededNoise::new(seed),
            );
            let mut out = Vec::new();
            for i in 0..10 {
                let t = TopicId::new(format!("topic-{i}"));
                out.push(scheduler.review(&t, 5).await.unwrap().interval_days);
            }
            out
        }

        let a = intervals(7).await;
        assert_eq!(a, intervals(7).await);
        for interval in &a {
            assert!((0.95..=1.05).contains(interval), "{interval}");
        }
    }

    #[tokio::test]
    async fn test_due_and_next_on_empty_store() {
        let f = fixture();
        assert!(f.scheduler.due(None).await.unwrap().is_empty());
        assert!(f.scheduler.upcoming(7.0, None).await.unwrap().is_empty());
        assert!(f.scheduler.next().await.unwrap().is_none());
        assert!(f.scheduler.queue(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_due_sorted_most_overdue_first() {
        let f = fixture();
        // b comes due a day before a
        f.scheduler.review(&topic("b"), 4).await.unwrap();
        f.clock.advance(Duration::days(1));
        f.scheduler.review(&topic("a"), 4).await.unwrap();
        f.clock.advance(Duration::days(3));

        let due = f.scheduler.due(None).await.unwrap();
        let names: Vec<_> = due.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(due[0].next_review <= due[1].next_review);

        assert_eq!(f.scheduler.due(Some(1)).await.unwrap().len(), 1);
        assert_eq!(f.scheduler.next().await.unwrap().unwrap().topic, topic("b"));
    }

    #[tokio::test]
    async fn test_upcoming_window_is_half_open() {
        let f = fixture();
        f.scheduler.review(&topic("one-day"), 4).await.unwrap();
        f.scheduler.review(&topic("six-days"), 4).await.unwrap();
        f.scheduler.review(&topic("six-days"), 4).await.unwrap();

        let within_day = f.scheduler.upcoming(1.0, None).await.unwrap();
        assert_eq!(within_day.len(), 1);
        assert_eq!(within_day[0].topic, topic("one-day"));

        let week = f.scheduler.upcoming(7.0, None).await.unwrap();
        let names: Vec<_> = week.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(names, ["one-day", "six-days"]);

        // Exactly at the due instant it is due, not upcoming
        f.clock.advance(Duration::days(1));
        let week = f.scheduler.upcoming(7.0, None).await.unwrap();
        assert_eq!(week.len(), 1);
        assert_eq!(f.scheduler.due(None).await.unwrap()[0].topic, topic("one-day"));
    }

    #[tokio::test]
    async fn test_stats_for_unknown_topic_creates_nothing() {
        let f = fixture();
        assert!(f.scheduler.stats(&topic("ghost")).await.unwrap().is_none());
        assert!(f.storage.load_schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_view() {
        let f = fixture();
        let t = topic("paging");
        for q in [5, 3, 4, 1, 5, 4] {
            f.scheduler.review(&t, q).await.unwrap();
        }

        let stats = f.scheduler.stats(&t).await.unwrap().unwrap();
        assert_eq!(stats.total_reviews, 6);
        assert!((stats.average_quality - 22.0 / 6.0).abs() < 1e-12);
        assert_eq!(stats.recent_quality, vec![3, 4, 1, 5, 4]);
        assert_eq!(stats.status, ReviewState::Upcoming);
        assert!(stats.days_until_review > 0.0);
        assert_eq!(stats.last_review, Some(start()));

        f.clock.advance(Duration::days(30));
        let later = f.scheduler.stats(&t).await.unwrap().unwrap();
        assert_eq!(later.status, ReviewState::Overdue);
        assert!(later.days_until_review < 0.0);

        // Reads leave the store alone
        let before = f.storage.load_schedule().await.unwrap();
        f.scheduler.stats(&t).await.unwrap();
        assert_eq!(f.storage.load_schedule().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_stats_status_at_exact_due_time() {
        let f = fixture();
        let t = topic("paging");
        f.scheduler.review(&t, 4).await.unwrap();

        // Zero days left: listed as due, but not yet overdue
        f.clock.advance(Duration::days(1));
        let stats = f.scheduler.stats(&t).await.unwrap().unwrap();
        assert_eq!(stats.days_until_review, 0.0);
        assert_eq!(stats.status, ReviewState::Upcoming);
        assert_eq!(f.scheduler.due(None).await.unwrap().len(), 1);

        f.clock.advance(Duration::seconds(1));
        let stats = f.scheduler.stats(&t).await.unwrap().unwrap();
        assert_eq!(stats.status, ReviewState::Overdue);
    }

    #[tokio::test]
    async fn test_long_run_of_perfect_reviews_stays_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(tutor_storage::JsonStorage::new(dir.path()).await.unwrap());
        let clock = Arc::new(FixedClock::new(start()));
        let scheduler =
            ReviewScheduler::new(storage.clone(), Sm2Params::default(), clock, ZeroNoise);
        let t = topic("paging");

        for _ in 0..25 {
            let outcome = scheduler.review(&t, 5).await.unwrap();
            assert!(outcome.interval_days <= 36_500.0);
        }

        let store = storage.load_schedule().await.unwrap();
        let record = store.get(&t).unwrap();
        assert_eq!(record.total_reviews, 25);
        assert_eq!(record.interval, 36_500.0);
        assert_eq!(record.next_review, start() + Duration::days(36_500));
        assert!(scheduler.due(None).await.unwrap().is_empty());
        assert_eq!(scheduler.upcoming(40_000.0, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_returns_topic_to_fresh() {
        let f = fixture();
        let t = topic("paging");
        f.scheduler.review(&t, 5).await.unwrap();
        f.scheduler.review(&t, 5).await.unwrap();

        assert!(f.scheduler.reset(&t).await.unwrap());
        assert!(f.scheduler.stats(&t).await.unwrap().is_none());
        assert!(!f.scheduler.reset(&t).await.unwrap());

        let again = f.scheduler.review(&t, 5).await.unwrap();
        assert_eq!(again.total_reviews, 1);
        assert_eq!(again.interval_days, 1.0);
        assert!((again.ease_factor - 2.6).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_queue_puts_overdue_before_upcoming() {
        let f = fixture();
        f.scheduler.review(&topic("overdue-1"), 4).await.unwrap();
        f.scheduler.review(&topic("overdue-2"), 4).await.unwrap();
        f.clock.advance(Duration::days(2));
        f.scheduler.review(&topic("soon"), 4).await.unwrap();
        f.scheduler.review(&topic("later"), 4).await.unwrap();
        f.scheduler.review(&topic("later"), 4).await.unwrap();
        f.scheduler.review(&topic("far"), 4).await.unwrap();
        f.scheduler.review(&topic("far"), 4).await.unwrap();
        f.scheduler.review(&topic("far"), 4).await.unwrap();

        let queue = f.scheduler.queue(10).await.unwrap();
        let names: Vec<_> = queue.iter().map(|e| e.stats.topic.as_str()).collect();
        // far is 15 days out, past the seven day window
        assert_eq!(names, ["overdue-1", "overdue-2", "soon", "later"]);
        assert_eq!(queue[0].priority, QueuePriority::Overdue);
        assert_eq!(queue[2].priority, QueuePriority::Upcoming);

        let short = f.scheduler.queue(3).await.unwrap();
        assert_eq!(short.len(), 3);
        assert_eq!(short[2].stats.topic, topic("soon"));

        assert_eq!(f.scheduler.queue(1).await.unwrap()[0].stats.topic, topic("overdue-1"));
        assert!(f.scheduler.queue(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_entry_serializes_flat() {
        let f = fixture();
        f.scheduler.review(&topic("paging"), 4).await.unwrap();
        let queue = f.scheduler.queue(5).await.unwrap();
        let json = serde_json::to_value(&queue[0]).unwrap();
        assert_eq!(json["priority"], "upcoming");
        assert_eq!(json["topic"], "paging");
        assert_eq!(json["status"], "upcoming");
    }

    #[tokio::test]
    async fn test_concurrent_reviews_are_not_lost() {
        let f = fixture();
        let scheduler = Arc::new(f.scheduler);
        let mut handles = Vec::new();
        for _ in 0..16 {
            let scheduler = scheduler.clone();
            handles.push(tokio::spawn(async move {
                scheduler.review(&TopicId::new("paging"), 4).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let store = f.storage.load_schedule().await.unwrap();
        assert_eq!(store.get(&topic("paging")).unwrap().total_reviews, 16);
    }
}
