//! JSON file storage implementation.
//!
//! Stores each store as one pretty-printed JSON file in a data directory:
//! `progress.json` (mastery), `schedule.json` and `sessions.json`. A file that
//! does not exist yet reads as an empty store; a file that exists but cannot
//! be parsed is an error, never silently reset.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use tutor_core::{MasteryStore, ScheduleStore, SessionStore};
use super::{Storage, StorageError, Result};

const MASTERY_FILE: &str = "progress.json";
const SCHEDULE_FILE: &str = "schedule.json";
const SESSIONS_FILE: &str = "sessions.json";

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn mastery_path(&self) -> PathBuf {
        self.root.join(MASTERY_FILE)
    }
    fn schedule_path(&self) -> PathBuf {
        self.root.join(SCHEDULE_FILE)
    }
    fn sessions_path(&self) -> PathBuf {
        self.root.join(SESSIONS_FILE)
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn load_mastery(&self) -> Result<MasteryStore> {
        Ok(read_json(&self.mastery_path()).await?.unwrap_or_default())
    }

    async fn save_mastery(&self, store: &MasteryStore) -> Result<()> {
        write_json(&self.mastery_path(), store).await
    }

    async fn load_schedule(&self) -> Result<ScheduleStore> {
        Ok(read_json(&self.schedule_path()).await?.unwrap_or_default())
    }

    async fn save_schedule(&self, store: &ScheduleStore) -> Result<()> {
        write_json(&self.schedule_path(), store).await
    }

    async fn load_sessions(&self) -> Result<Option<SessionStore>> {
        read_json(&self.sessions_path()).await
    }

    async fn save_sessions(&self, store: &SessionStore) -> Result<()> {
        write_json(&self.sessions_path(), store).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json).map_err(|source| StorageError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} not found, starting empty", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Writes go through a sibling temp file and a rename.
async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
