//! Directory-backed session store: one JSON file per session.
//!
//! Saves go to a temporary file that is renamed over the target, so a
//! reader sees either the previous version or the new one, never a torn
//! write.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::store::{validate_key, SessionStore, StoreResult, StoredSession};
use super::types::ConversationState;
use crate::types::SessionId;

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> StoreResult<PathBuf> {
        validate_key(session_id)?;
        Ok(self.dir.join(format!("{session_id}.{EXTENSION}")))
    }

    async fn read(&self, path: &Path) -> StoreResult<Option<StoredSession>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(StoredSession::decode(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn session_paths(&self) -> std::io::Result<Vec<(SessionId, PathBuf)>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.push((stem.to_string(), path.clone()));
            }
        }
        out.sort();
        Ok(out)
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load(&self, session_id: &str) -> StoreResult<Option<ConversationState>> {
        let path = self.path_for(session_id)?;
        Ok(self.read(&path).await?.map(|s| s.observe(Utc::now())))
    }

    async fn save(
        &self,
        session_id: &str,
        state: &ConversationState,
        ttl: Duration,
    ) -> StoreResult<()> {
        let path = self.path_for(session_id)?;
        let bytes = StoredSession::encode(session_id, state, ttl)?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));

        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(session_id, path = %path.display(), "Saved session file");
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<bool> {
        let path = self.path_for(session_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now();
        let mut removed = 0;
        for (id, path) in self.session_paths()? {
            match self.read(&path).await {
                Ok(Some(stored)) if stored.is_expired(now) => {
                    tokio::fs::remove_file(&path).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(session_id = %id, error = %e, "Skipping unreadable session file"),
            }
        }
        Ok(removed)
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionId>> {
        Ok(self
            .session_paths()?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SessionStatus, StoreError};
    use crate::types::{Classification, UserConcern};

    fn state(id: &str) -> ConversationState {
        ConversationState::new(id, UserConcern::new("worry", None), Classification::general())
    }

    #[tokio::test]
    async fn test_roundtrip_and_no_leftover_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let s = state("abc-123");

        store.save("abc-123", &s, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.load("abc-123").await.unwrap().unwrap(), s);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["abc-123.json".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_session_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.load("nope").await.unwrap().is_none());
        assert!(!store.delete("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let err = store.load("../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_expiry_and_purge() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.save("old", &state("old"), Duration::ZERO).await.unwrap();
        store
            .save("new", &state("new"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            store.load("old").await.unwrap().unwrap().status,
            SessionStatus::Expired
        );
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.list_sessions().await.unwrap(), vec!["new".to_string()]);
    }
}
