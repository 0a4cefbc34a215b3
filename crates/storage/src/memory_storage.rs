//! In-memory storage implementation.

use tokio::sync::RwLock;
use tutor_core::{MasteryStore, ScheduleStore, SessionStore};
use super::{Storage, Result};

/// Storage backend that keeps every store in memory.
///
/// Useful for tests and for embedding the engines without touching disk.
#[derive(Default)]
pub struct MemoryStorage {
    mastery: RwLock<MasteryStore>,
    schedule: RwLock<ScheduleStore>,
    sessions: RwLock<Option<SessionStore>>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with the given stores.
    pub fn with_stores(mastery: MasteryStore, schedule: ScheduleStore) -> Self {
        Self {
            mastery: RwLock::new(mastery),
            schedule: RwLock::new(schedule),
            sessions: RwLock::new(None),
        }
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn load_mastery(&self) -> Result<MasteryStore> {
        Ok(self.mastery.read().await.clone())
    }

    async fn save_mastery(&self, store: &MasteryStore) -> Result<()> {
        *self.mastery.write().await = store.clone();
        Ok(())
    }

    async fn load_schedule(&self) -> Result<ScheduleStore> {
        Ok(self.schedule.read().await.clone())
    }

    async fn save_schedule(&self, store: &ScheduleStore) -> Result<()> {
        *self.schedule.write().await = store.clone();
        Ok(())
    }

    async fn load_sessions(&self) -> Result<Option<SessionStore>> {
        Ok(self.sessions.read().await.clone())
    }

    async fn save_sessions(&self, store: &SessionStore) -> Result<()> {
        *self.sessions.write().await = Some(store.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::{TopicId, TopicMasteryRecord};

    #[tokio::test]
    async fn test_in_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.load_mastery().await.unwrap().is_empty());

        let mut store = MasteryStore::default();
        store.insert(TopicId::new("paging"), TopicMasteryRecord::new(0.3));
        storage.save_mastery(&store).await.unwrap();

        assert_eq!(storage.load_mastery().await.unwrap(), store);
    }
}
