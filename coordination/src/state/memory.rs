//! In-process session store.
//!
//! Holds the serialized envelope rather than live structs, so every load
//! hands out an independent copy and the store stays the single owner of
//! the persisted representation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::store::{SessionStore, StoreResult, StoredSession};
use super::types::ConversationState;
use crate::types::SessionId;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<SessionId, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn load(&self, session_id: &str) -> StoreResult<Option<ConversationState>> {
        let entries = self.entries.read().await;
        match entries.get(session_id) {
            Some(bytes) => Ok(Some(StoredSession::decode(bytes)?.observe(Utc::now()))),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session_id: &str,
        state: &ConversationState,
        ttl: Duration,
    ) -> StoreResult<()> {
        let bytes = StoredSession::encode(session_id, state, ttl)?;
        self.entries
            .write()
            .await
            .insert(session_id.to_string(), bytes);
        debug!(session_id, "Saved session to memory store");
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<bool> {
        Ok(self.entries.write().await.remove(session_id).is_some())
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, bytes| {
            StoredSession::decode(bytes)
                .map(|stored| !stored.is_expired(now))
                .unwrap_or(false)
        });
        Ok(before - entries.len())
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionId>> {
        let mut ids: Vec<SessionId> = self.entries.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionStatus;
    use crate::types::{Classification, UserConcern};

    fn state(id: &str) -> ConversationState {
        ConversationState::new(id, UserConcern::new("worry", None), Classification::general())
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let store = InMemoryStore::new();
        let s = state("a");
        store.save("a", &s, Duration::from_secs(60)).await.unwrap();

        let loaded = store.load("a").await.unwrap().unwrap();
        assert_eq!(loaded, s);
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_reports_expired_and_purges() {
        let store = InMemoryStore::new();
        store.save("old", &state("old"), Duration::ZERO).await.unwrap();
        store
            .save("fresh", &state("fresh"), Duration::from_secs(60))
            .await
            .unwrap();

        let old = store.load("old").await.unwrap().unwrap();
        assert_eq!(old.status, SessionStatus::Expired);

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.list_sessions().await.unwrap(), vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        store.save("a", &state("a"), Duration::from_secs(60)).await.unwrap();
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.is_empty().await);
    }
}
