//! Study session tracking.
//!
//! Keeps a day streak, a session counter and a bounded activity log. Days
//! are UTC calendar days of the injected clock.

use std::sync::Arc;
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tutor_core::{SessionLogEntry, SessionStore, Time, TopicId, ValidationError};
use tutor_storage::Storage;
use crate::clock::Clock;
use crate::error::Result;

/// Actions that count toward `total_problems`.
const PROBLEM_ACTIONS: [&str; 3] = ["completed", "answered", "reviewed"];

/// How a new session affected the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakStatus {
    /// First session ever
    Started,
    /// Another session on the same day
    Continued,
    /// First session the day after the last one
    Extended,
    /// One or more days were skipped
    Broken,
}

/// Result of starting a session.
#[derive(Debug, Clone, Serialize)]
pub struct StreakUpdate {
    /// Streak after this session
    pub streak: u32,
    /// What happened to it
    pub status: StreakStatus,
    /// Streak before this session
    pub old_streak: u32,
    /// Days skipped, when broken
    pub days_missed: u32,
    /// Best streak so far
    pub longest_streak: u32,
    /// Human-readable summary
    pub message: String,
}

/// Current streak as of now.
#[derive(Debug, Clone, Serialize)]
pub struct StreakInfo {
    /// Streak, or 0 if it has lapsed
    pub streak_days: u32,
    /// Best streak so far
    pub longest_streak: u32,
    /// Start of the most recent session
    pub last_session: Option<Time>,
    /// Whether a session was started today
    pub active_today: bool,
}

/// Result of logging an action.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedAction {
    /// Topic acted on
    pub topic: TopicId,
    /// Action name
    pub action: String,
    /// When it was logged
    pub timestamp: Time,
    /// Whether it counted as a problem
    pub counted: bool,
    /// Problems so far
    pub total_problems: u32,
}

/// Session figures combined with mastery aggregates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalStats {
    /// Sessions started
    pub sessions_count: u32,
    /// Problems completed, answered or reviewed
    pub total_problems: u32,
    /// Current streak
    pub streak_days: u32,
    /// Best streak
    pub longest_streak: u32,
    /// Topics with a mastery record
    pub total_topics: usize,
    /// Answers recorded across all topics
    pub total_attempts: u32,
    /// Correct answers across all topics
    pub total_correct: u32,
    /// `total_correct / total_attempts`, 0 with no attempts
    pub overall_accuracy: f64,
    /// Mean P(known), 0 with no topics
    pub average_mastery: f64,
}

/// Session and streak bookkeeping over the session store.
pub struct SessionTracker<S: Storage> {
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
    writer: Mutex<()>,
}

impl<S: Storage> SessionTracker<S> {
    /// Create a tracker.
    pub fn new(storage: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            writer: Mutex::new(()),
        }
    }

    async fn load_or_new(&self, now: Time) -> Result<SessionStore> {
        Ok(self
            .storage
            .load_sessions()
            .await?
            .unwrap_or_else(|| SessionStore::new(now)))
    }

    /// Start a study session and update the streak.
    pub async fn start_session(&self) -> Result<StreakUpdate> {
        let _guard = self.writer.lock().await;
        let now = self.clock.now();
        let mut store = self.load_or_new(now).await?;

        let today = now.date_naive();
        let old_streak = store.stats.streak_days;
        let gap = store.last_session.map(|last| days_apart(last.date_naive(), today));

        let (status, streak, days_missed) = match gap {
            None => (StreakStatus::Started, 1, 0),
            Some(gap) if gap <= 0 => (StreakStatus::Continued, old_streak.max(1), 0),
            Some(1) => (StreakStatus::Extended, old_streak + 1, 0),
            Some(gap) => {
                let missed = u32::try_from(gap - 1).unwrap_or(u32::MAX);
                (StreakStatus::Broken, 1, missed)
            }
        };

        store.stats.streak_days = streak;
        store.stats.longest_streak = store.stats.longest_streak.max(streak);
        store.stats.sessions_count += 1;
        store.last_session = Some(now);
        self.storage.save_sessions(&store).await?;

        let message = match status {
            StreakStatus::Started => "Streak started: day 1".to_string(),
            StreakStatus::Continued => format!("Streak continues: {streak} days"),
            StreakStatus::Extended => format!("Streak extended to {streak} days"),
            StreakStatus::Broken => format!(
                "Streak of {old_streak} days broken after {days_missed} missed days; starting over"
            ),
        };
        info!("session started: {}", message);

        Ok(StreakUpdate {
            streak,
            status,
            old_streak,
            days_missed,
            longest_streak: store.stats.longest_streak,
            message,
        })
    }

    /// The streak as of now; 0 if the last session was before yesterday.
    pub async fn current_streak(&self) -> Result<StreakInfo> {
        let now = self.clock.now();
        let Some(store) = self.storage.load_sessions().await? else {
            return Ok(StreakInfo {
                streak_days: 0,
                longest_streak: 0,
                last_session: None,
                active_today: false,
            });
        };
        Ok(streak_info(&store, now))
    }

    /// Append an action to the activity log.
    pub async fn log_action(&self, topic: &TopicId, action: &str) -> Result<LoggedAction> {
        if topic.is_blank() {
            warn!("rejecting session log entry: blank topic id");
            return Err(ValidationError::BlankTopic.into());
        }

        let _guard = self.writer.lock().await;
        let now = self.clock.now();
        let mut store = self.load_or_new(now).await?;

        let counted = PROBLEM_ACTIONS.contains(&action);
        if counted {
            store.stats.total_problems += 1;
        }
        store.push_log(SessionLogEntry {
            timestamp: now,
            topic: topic.clone(),
            action: action.to_string(),
        });
        self.storage.save_sessions(&store).await?;
        debug!(%topic, action, counted, "logged session action");

        Ok(LoggedAction {
            topic: topic.clone(),
            action: action.to_string(),
            timestamp: now,
            counted,
            total_problems: store.stats.total_problems,
        })
    }

    /// Session figures plus aggregates over the mastery store.
    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let now = self.clock.now();
        let sessions = self.storage.load_sessions().await?;
        let mastery = self.storage.load_mastery().await?;

        let mut stats = GlobalStats::default();
        if let Some(store) = &sessions {
            stats.sessions_count = store.stats.sessions_count;
            stats.total_problems = store.stats.total_problems;
            stats.streak_days = streak_info(store, now).streak_days;
            stats.longest_streak = store.stats.longest_streak;
        }

        stats.total_topics = mastery.len();
        let mut p_sum = 0.0;
        for record in mastery.topics.values() {
            stats.total_attempts += record.attempts;
            stats.total_correct += record.correct;
            p_sum += record.p_known;
        }
        if stats.total_attempts > 0 {
            stats.overall_accuracy = stats.total_correct as f64 / stats.total_attempts as f64;
        }
        if stats.total_topics > 0 {
            stats.average_mastery = p_sum / stats.total_topics as f64;
        }

        Ok(stats)
    }
}

fn days_apart(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

fn streak_info(store: &SessionStore, now: Time) -> StreakInfo {
    let gap = store
        .last_session
        .map(|last| days_apart(last.date_naive(), now.date_naive()));
    let streak_days = match gap {
        Some(gap) if gap <= 1 => store.stats.streak_days,
        _ => 0,
    };
    StreakInfo {
        streak_days,
        longest_streak: store.stats.longest_streak,
        last_session: store.last_session,
        active_today: gap.is_some_and(|gap| gap <= 0),
    }
}
