//! Session store contract.
//!
//! A store is a passive key-value ledger: it never edits state on its own
//! except to report an elapsed TTL as [`SessionStatus::Expired`] on load.
//! Writes are last-write-wins; the orchestrator serializes turns per
//! session, so there is never more than one writer for a key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ConversationState, SessionStatus};
use crate::types::SessionId;

/// Error type for state store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid session key: {0}")]
    InvalidKey(String),

    #[error("Key {key} does not match state session id {state_id}")]
    KeyMismatch { key: String, state_id: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[cfg(feature = "rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

/// Result type for state store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a session store
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Key-value persistence for [`ConversationState`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session. An elapsed TTL is reported as `Expired` status.
    async fn load(&self, session_id: &str) -> StoreResult<Option<ConversationState>>;

    /// Persist a session, resetting its TTL.
    async fn save(
        &self,
        session_id: &str,
        state: &ConversationState,
        ttl: Duration,
    ) -> StoreResult<()>;

    /// Remove a session. Returns whether it existed.
    async fn delete(&self, session_id: &str) -> StoreResult<bool>;

    /// Drop every expired entry. Returns how many were removed.
    async fn purge_expired(&self) -> StoreResult<usize>;

    /// Ids of every stored session, expired or not.
    async fn list_sessions(&self) -> StoreResult<Vec<SessionId>>;
}

/// Serialized form every backend stores: the state plus its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub expires_at: DateTime<Utc>,
    pub state: ConversationState,
}

impl StoredSession {
    /// Encode `state` with an expiry `ttl` from now.
    pub fn encode(session_id: &str, state: &ConversationState, ttl: Duration) -> StoreResult<Vec<u8>> {
        if state.session_id != session_id {
            return Err(StoreError::KeyMismatch {
                key: session_id.to_string(),
                state_id: state.session_id.clone(),
            });
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Serialization(format!("ttl out of range: {e}")))?;
        let envelope = StoredSessionRef {
            expires_at: Utc::now() + ttl,
            state,
        };
        serde_json::to_vec(&envelope).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The state as a reader should see it at `now`.
    pub fn observe(self, now: DateTime<Utc>) -> ConversationState {
        let expired = self.is_expired(now);
        let mut state = self.state;
        if expired && state.status == SessionStatus::Active {
            state.status = SessionStatus::Expired;
        }
        state
    }
}

/// Borrowing twin of [`StoredSession`] so saves don't clone the state.
#[derive(Serialize)]
struct StoredSessionRef<'a> {
    expires_at: DateTime<Utc>,
    state: &'a ConversationState,
}

/// Reject keys that could escape a directory or collide after encoding.
pub fn validate_key(session_id: &str) -> StoreResult<()> {
    let ok = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classification, UserConcern};

    fn state(id: &str) -> ConversationState {
        ConversationState::new(id, UserConcern::new("hello", None), Classification::general())
    }

    #[test]
    fn test_encode_rejects_mismatched_key() {
        let err = StoredSession::encode("other", &state("s-1"), Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, StoreError::KeyMismatch { .. }));
    }

    #[test]
    fn test_zero_ttl_observed_as_expired() {
        let bytes = StoredSession::encode("s-1", &state("s-1"), Duration::ZERO).unwrap();
        let observed = StoredSession::decode(&bytes).unwrap().observe(Utc::now());
        assert_eq!(observed.status, SessionStatus::Expired);
    }

    #[test]
    fn test_closed_state_stays_closed_after_expiry() {
        let mut s = state("s-1");
        s.status = SessionStatus::Closed;
        let bytes = StoredSession::encode("s-1", &s, Duration::ZERO).unwrap();
        let observed = StoredSession::decode(&bytes).unwrap().observe(Utc::now());
        assert_eq!(observed.status, SessionStatus::Closed);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("0b6c1d2e-aaaa-4bbb-8ccc-123456789abc").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }
}
