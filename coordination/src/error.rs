//! Error types surfaced by the orchestrator.
//!
//! Generation failures never appear here: responders recover from them
//! locally. Exhausting the arc is not an error either; it resolves to
//! TERMINAL.

use crate::escalation::TransitionError;
use crate::state::StoreError;
use crate::types::SessionId;

/// Rejected user input. Raised before classification; no state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message is empty")]
    Empty,

    #[error("message is {len} characters; the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("session history reached {max} turns; start a new session")]
    HistoryFull { max: usize },
}

/// Why a session could not be continued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    Missing,
    Expired,
    Closed,
}

impl std::fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Expired => write!(f, "expired"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Errors returned by orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The caller should start a new session.
    #[error("session not found: {session_id} ({reason})")]
    SessionNotFound {
        session_id: SessionId,
        reason: NotFoundReason,
    },

    /// The turn was not persisted; state did not advance, so a retry is safe.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("state machine violation: {0}")]
    Transition(#[from] TransitionError),
}

impl OrchestratorError {
    pub(crate) fn not_found(session_id: &str, reason: NotFoundReason) -> Self {
        Self::SessionNotFound {
            session_id: session_id.to_string(),
            reason,
        }
    }

    /// Whether the caller should start over with a new session.
    pub fn requires_new_session(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }

    /// Whether the session expired, as opposed to being missing or closed.
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound {
                reason: NotFoundReason::Expired,
                ..
            }
        )
    }

    /// Stable machine-readable kind for transports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::SessionNotFound {
                reason: NotFoundReason::Expired,
                ..
            } => "session_expired",
            Self::SessionNotFound { .. } => "session_not_found",
            Self::Persistence(_) => "persistence_failure",
            Self::Transition(_) => "internal_error",
        }
    }
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
