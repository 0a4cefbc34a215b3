//! Tutor core data models.
//!
//! This crate defines the per-topic records owned by the mastery estimator
//! and the review scheduler, the persisted store shapes, and the model
//! parameters both engines are constructed with.

#![warn(missing_docs)]

// Identities
mod id;

// Inputs and validation
mod error;
mod quality;

// Model parameters
mod config;

// Records and stores
mod mastery;
mod schedule;
mod session;

pub mod time;

// Re-exports
pub use id::TopicId;
pub use error::ValidationError;
pub use quality::{Quality, parse_correctness};
pub use config::{EngineConfig, BktParams, Sm2Params};
pub use mastery::{TopicMasteryRecord, MasteryStore, MasteryStatus, MIN_DIFFICULTY, MAX_DIFFICULTY};
pub use schedule::{TopicScheduleRecord, QualityEntry, ScheduleStore};
pub use session::{SessionStore, SessionStats, SessionLogEntry, SESSION_LOG_LIMIT};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
