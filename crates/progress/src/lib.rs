//! Adaptive mastery and review scheduling.
//!
//! Bayesian Knowledge Tracing over answer outcomes, SM-2 style interval
//! scheduling over quality-rated reviews, and the read-only consumers built
//! on top of both (priority ranking, study-session tracking).

#![warn(missing_docs)]

pub mod error;
pub mod clock;
pub mod noise;
pub mod bkt;
pub mod sm2;
pub mod estimator;
pub mod scheduler;
pub mod ranking;
pub mod tracker;

pub use error::{EngineError, Result};
pub use clock::{Clock, SystemClock, FixedClock};
pub use noise::{NoiseSource, SeededNoise, ZeroNoise, ConstantNoise};
pub use estimator::{
    MasteryEstimator, MasteryUpdate, MasteryView, StatusReport, TopicStatus, Suggestion,
    SuggestReason,
};
pub use scheduler::{
    ReviewScheduler, ReviewOutcome, ScheduledTopic, TopicStats, ReviewState, QueueEntry,
    QueuePriority,
};
pub use ranking::{PriorityRanker, RankedTopic, FlagAdvice, priority_score, should_flag};
pub use tracker::{
    SessionTracker, StreakUpdate, StreakStatus, StreakInfo, LoggedAction, GlobalStats,
};
