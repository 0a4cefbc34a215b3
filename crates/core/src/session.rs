//! Study session model - streaks and a bounded activity log.

use serde::{Deserialize, Serialize};
use crate::id::TopicId;
use crate::Time;

/// Number of activity log entries retained.
pub const SESSION_LOG_LIMIT: usize = 100;

/// Persisted session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStore {
    /// When the store was first created
    #[serde(with = "crate::time::iso8601")]
    pub created_at: Time,

    /// Start of the most recent session
    #[serde(default, with = "crate::time::iso8601::option")]
    pub last_session: Option<Time>,

    /// Aggregate counters
    #[serde(default)]
    pub stats: SessionStats,

    /// Most recent study actions, oldest first
    #[serde(default)]
    pub session_log: Vec<SessionLogEntry>,
}

/// Aggregate session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    /// Problems completed, answered or reviewed
    pub total_problems: u32,
    /// Consecutive study days ending at the last session
    pub streak_days: u32,
    /// Best streak ever
    pub longest_streak: u32,
    /// Sessions started
    pub sessions_count: u32,
}

/// One logged study action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    /// When it happened
    #[serde(with = "crate::time::iso8601")]
    pub timestamp: Time,
    /// Topic acted on
    pub topic: TopicId,
    /// Free-form action name
    pub action: String,
}

impl SessionStore {
    /// An empty store created at `now`.
    pub fn new(now: Time) -> Self {
        Self {
            created_at: now,
            last_session: None,
            stats: SessionStats::default(),
            session_log: Vec::new(),
        }
    }

    /// Append a log entry, evicting the oldest past [`SESSION_LOG_LIMIT`].
    pub fn push_log(&mut self, entry: SessionLogEntry) {
        self.session_log.push(entry);
        if self.session_log.len() > SESSION_LOG_LIMIT {
            let excess = self.session_log.len() - SESSION_LOG_LIMIT;
            self.session_log.drain(..excess);
        }
    }
}
