//! RocksDB-backed session store (behind the `rocksdb` feature).
//!
//! Sessions live in their own column family under `sess:{id}` keys, stored
//! as the same JSON envelope the other backends use.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};

use super::store::{SessionStore, StoreError, StoreResult, StoredSession};
use super::types::ConversationState;
use crate::types::SessionId;

/// Column family for conversation sessions
pub const CF_SESSIONS: &str = "sessions";

const KEY_PREFIX: &str = "sess:";

fn session_key(session_id: &str) -> String {
    format!("{KEY_PREFIX}{session_id}")
}

pub struct RocksStore {
    db: Arc<DB>,
    path: PathBuf,
}

impl RocksStore {
    /// Open or create a store at the given path
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default())];
        let db = DB::open_cf_descriptors(&opts, &path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cf(&self) -> StoreResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_SESSIONS)
            .ok_or_else(|| StoreError::Backend(format!("column family not found: {CF_SESSIONS}")))
    }

    fn entries(&self) -> StoreResult<Vec<(SessionId, StoredSession)>> {
        let cf = self.cf()?;
        let mut out = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, KEY_PREFIX.as_bytes()) {
            let (key, value) = item?;
            let Ok(key) = std::str::from_utf8(&key) else {
                continue;
            };
            let Some(id) = key.strip_prefix(KEY_PREFIX) else {
                break;
            };
            out.push((id.to_string(), StoredSession::decode(&value)?));
        }
        Ok(out)
    }
}

#[async_trait]
impl SessionStore for RocksStore {
    async fn load(&self, session_id: &str) -> StoreResult<Option<ConversationState>> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, session_key(session_id).as_bytes())? {
            Some(bytes) => Ok(Some(StoredSession::decode(&bytes)?.observe(Utc::now()))),
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
        let cf = self.cf()?;
        self.db.put_cf(cf, session_key(session_id).as_bytes(), bytes)?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<bool> {
        let cf = self.cf()?;
        let key = session_key(session_id);
        let existed = self.db.get_cf(cf, key.as_bytes())?.is_some();
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(existed)
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now();
        let cf = self.cf()?;
        let mut removed = 0;
        for (id, stored) in self.entries()? {
            if stored.is_expired(now) {
                self.db.delete_cf(cf, session_key(&id).as_bytes())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionId>> {
        Ok(self.entries()?.into_iter().map(|(id, _)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classification, UserConcern};

    #[tokio::test]
    async fn test_roundtrip_and_purge() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path().join("db")).unwrap();
        let live = ConversationState::new("live", UserConcern::new("w", None), Classification::general());
        let dead = ConversationState::new("dead", UserConcern::new("w", None), Classification::general());

        store.save("live", &live, Duration::from_secs(60)).await.unwrap();
        store.save("dead", &dead, Duration::ZERO).await.unwrap();

        assert_eq!(store.load("live").await.unwrap().unwrap(), live);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.list_sessions().await.unwrap(), vec!["live".to_string()]);
    }
}
