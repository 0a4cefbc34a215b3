//! Storage trait abstraction.

use std::path::PathBuf;
use async_trait::async_trait;
use tutor_core::{MasteryStore, ScheduleStore, SessionStore};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A store file exists but does not have the expected structure
    #[error("invalid store file {}: {source}", .path.display())]
    Invalid {
        /// Offending file
        path: PathBuf,
        /// Parse failure
        source: serde_json::Error,
    },
}

/// Storage abstraction for the tutor stores.
///
/// Each store is loaded and persisted whole. Callers that read, modify and
/// write a store back are responsible for serializing those sequences; the
/// engines in `tutor-progress` hold one writer lock per store for that.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Mastery store ===

    /// Load the mastery store (empty if it was never written).
    async fn load_mastery(&self) -> Result<MasteryStore>;

    /// Persist the mastery store.
    async fn save_mastery(&self, store: &MasteryStore) -> Result<()>;

    // === Schedule store ===

    /// Load the schedule store (empty if it was never written).
    async fn load_schedule(&self) -> Result<ScheduleStore>;

    /// Persist the schedule store.
    async fn save_schedule(&self, store: &ScheduleStore) -> Result<()>;

    // === Session store ===

    /// Load the session store, if one was ever written.
    async fn load_sessions(&self) -> Result<Option<SessionStore>>;

    /// Persist the session store.
    async fn save_sessions(&self, store: &SessionStore) -> Result<()>;
}
