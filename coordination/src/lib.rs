//! Worry Spiral Coordination Library
//!
//! Turns a single free-text worry into a multi-turn, multi-persona
//! escalation dialogue. A pipeline of responders takes turns reading the
//! conversation, deciding how alarmed to sound, generating prose, and
//! handing off to the next responder.
//!
//! # Components
//!
//! - [`lexicon`]: category, trigger, and readiness keyword tables
//! - [`router`]: concern classifier (category + trigger set)
//! - [`responders`]: the `Responder` contract and six personas
//! - [`escalation`]: arc phase machine and pure hand-off selector
//! - [`state`]: conversation state and session stores
//! - [`generation`]: text-generation boundary, HTTP client, offline stub
//! - [`orchestrator`]: per-session turn loop
//! - [`transport`]: `{session_id?, text}` chat gateway
//! - [`analytics`]: read-only anxiety-arc summaries
//!
//! # Flow
//!
//! ```text
//! message ─▶ load state ─▶ classify ─▶ active responder ─▶ raise anxiety
//!        ─▶ append history ─▶ hand-off selector ─▶ save ─▶ reply
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coordination::{InMemoryStore, Lexicon, OfflineGenerator, Orchestrator, OrchestratorConfig};
//!
//! let orchestrator = Orchestrator::new(
//!     OrchestratorConfig::default(),
//!     Lexicon::builtin().shared(),
//!     Arc::new(OfflineGenerator),
//!     Arc::new(InMemoryStore::new()),
//! );
//! let (session_id, first) = orchestrator.start_session("my boss emailed me").await?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod analytics;
pub mod config;
pub mod error;
pub mod escalation;
pub mod generation;
pub mod lexicon;
pub mod orchestrator;
pub mod otel;
pub mod responders;
pub mod router;
pub mod state;
pub mod transport;
pub mod types;

// Re-export core domain types
pub use types::{
    AgentResponse, AnxietyLevel, Classification, EscalationTrigger, Metadata, NextStep, Readiness,
    ResponderId, SessionId, Speaker, Turn, UserConcern, WorryCategory,
};

// Re-export orchestrator and transport types
pub use orchestrator::{Orchestrator, SharedOrchestrator, TurnInput};
pub use transport::{ChatFailure, ChatGateway, ChatReply, ChatRequest};

// Re-export configuration and error types
pub use config::{ConfigError, OrchestratorConfig};
pub use error::{NotFoundReason, OrchestratorError, OrchestratorResult, ValidationError};

// Re-export classification and lexicon types
pub use lexicon::{Lexicon, LexiconError, SharedLexicon};
pub use router::{ClassificationReport, ConcernClassifier};

// Re-export escalation types
pub use escalation::{ArcPhase, HandoffDecision, HandoffReason, HandoffSelector};

// Re-export responder types
pub use responders::{Responder, ResponderRegistry};

// Re-export state types
pub use state::{
    ConversationState, FileStore, InMemoryStore, SessionStatus, SessionStore, SharedSessionStore,
    StoreError,
};

// Re-export generation types
pub use generation::{
    GenerationEndpoint, GenerationError, GenerationHealth, GenerationService, HttpGenerator,
    OfflineGenerator, SharedGenerator,
};

// Re-export analytics types
pub use analytics::{AnxietyTrend, ArcSummary};
