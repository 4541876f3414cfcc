//! Conversation orchestrator.
//!
//! Owns the session lifecycle: validates input, classifies it, runs the
//! active responder, applies the hand-off selector, and persists the result.
//!
//! ```text
//! start_session(text)                     continue_session(id, input)
//!   validate ─ classify                     validate ─ lock(id) ─ load
//!   fresh state (INTAKE)                    open? ─ history cap ─ classify
//!        │                                       │
//!        └────────────┬──────────────────────────┘
//!                     ▼
//!              run_turn(local copy)
//!     responder.generate → raise anxiety → append turn
//!     selector.select → ESCALATING / next responder / TERMINAL + close
//!                     │
//!                     ▼
//!               store.save (once)
//! ```
//!
//! Every state-changing call performs exactly one load (none for
//! `start_session`) and one save. Work happens on a local copy, so a dropped
//! future leaves the previous persisted state untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::analytics::{self, ArcSummary};
use crate::config::OrchestratorConfig;
use crate::error::{NotFoundReason, OrchestratorError, OrchestratorResult, ValidationError};
use crate::escalation::{ArcPhase, HandoffInput, HandoffSelector};
use crate::generation::{ContentSource, GenerationHealth, SharedGenerator};
use crate::lexicon::SharedLexicon;
use crate::otel;
use crate::responders::{pick, turn_rng, GenerationSettings, ResponderRegistry, TurnContext};
use crate::router::ConcernClassifier;
use crate::state::{ConversationState, SessionStatus, SharedSessionStore};
use crate::types::{
    AgentResponse, NextStep, Readiness, ResponderId, SessionId, Speaker, Turn, UserConcern,
};

/// Shared reference to an orchestrator.
pub type SharedOrchestrator = Arc<Orchestrator>;

/// What the user sent on a continuation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum TurnInput {
    /// New text from the user.
    Message(String),
    /// Let the next responder speak without new input.
    Continue,
}

impl TurnInput {
    /// Empty text and the literal word `continue` both mean [`TurnInput::Continue`].
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("continue") {
            Self::Continue
        } else {
            Self::Message(trimmed.to_string())
        }
    }
}

type LockMap = StdMutex<HashMap<SessionId, Arc<Mutex<()>>>>;

/// Holds a session's turn lock. On drop the lock is released and the map
/// entry removed if nobody else holds or awaits it.
struct SessionGuard<'a> {
    locks: &'a LockMap,
    session_id: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Clones are only taken under this map lock, so a count of one
        // means no caller can still reach this mutex.
        if locks
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.session_id);
        }
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    classifier: ConcernClassifier,
    registry: ResponderRegistry,
    selector: HandoffSelector,
    generator: SharedGenerator,
    store: SharedSessionStore,
    /// Per-session turn locks. An entry lives only while some call holds
    /// or waits on it.
    locks: LockMap,
    health: StdMutex<GenerationHealth>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        lexicon: SharedLexicon,
        generator: SharedGenerator,
        store: SharedSessionStore,
    ) -> Self {
        Self {
            selector: HandoffSelector::with_ceiling(config.turn_ceiling),
            classifier: ConcernClassifier::new(Arc::clone(&lexicon)),
            registry: ResponderRegistry::builtin(lexicon),
            config,
            generator,
            store,
            locks: StdMutex::new(HashMap::new()),
            health: StdMutex::new(GenerationHealth::default()),
        }
    }

    pub fn shared(self) -> SharedOrchestrator {
        Arc::new(self)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ConcernClassifier {
        &self.classifier
    }

    /// Snapshot of generation backend health.
    pub fn generation_health(&self) -> GenerationHealth {
        self.health
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Open a new session and run the Intake persona on `text`.
    pub async fn start_session(&self, text: &str) -> OrchestratorResult<(SessionId, AgentResponse)> {
        let text = self.validate_text(text)?;
        let classification = self.classifier.classify(text, None);
        let session_id = Uuid::new_v4().to_string();

        let mut state = ConversationState::new(
            session_id.clone(),
            UserConcern::new(text, Some(0)),
            classification,
        );

        let span = otel::turn_span(&session_id, "start", 0);
        let mut response = self.run_turn(&mut state).instrument(span).await?;

        let intake = self.registry.get(ResponderId::Intake);
        let mut rng = turn_rng(self.config.rng_seed, &session_id, usize::MAX);
        response
            .metadata
            .insert("opening_line".into(), json!(pick(&mut rng, intake.opening_lines())));

        self.store
            .save(&session_id, &state, self.config.state_ttl())
            .await?;

        info!(
            session_id = %session_id,
            category = %state.classification.category,
            next = %response.next,
            "Session started"
        );
        Ok((session_id, response))
    }

    /// Advance a session by one responder turn.
    pub async fn continue_session(
        &self,
        session_id: &str,
        input: TurnInput,
    ) -> OrchestratorResult<AgentResponse> {
        let message = match &input {
            TurnInput::Message(text) => Some(self.validate_text(text)?.to_string()),
            TurnInput::Continue => None,
        };

        let _guard = self.lock_session(session_id).await;

        let mut state = self.load_open(session_id).await?;
        if state.history.len() >= self.config.max_history_turns {
            return Err(ValidationError::HistoryFull {
                max: self.config.max_history_turns,
            }
            .into());
        }

        if let Some(text) = &message {
            state.classification = self
                .classifier
                .classify(text, Some(state.classification.category));
            state.push_user_message(text);
        }

        let span = otel::turn_span(session_id, "continue", state.next_turn_index());
        let response = self.run_turn(&mut state).instrument(span).await?;

        self.store
            .save(session_id, &state, self.config.state_ttl())
            .await?;
        Ok(response)
    }

    /// Ask the active responder whether it has enough to hand off. Read-only.
    pub async fn readiness_check(&self, session_id: &str) -> OrchestratorResult<Readiness> {
        let state = self.load_open(session_id).await?;
        let active = state
            .active
            .ok_or_else(|| OrchestratorError::not_found(session_id, NotFoundReason::Closed))?;
        Ok(self.registry.get(active).readiness(&state.history))
    }

    /// Close an active session with a closing system turn. Returns the
    /// closing message.
    pub async fn end_session(&self, session_id: &str, reason: &str) -> OrchestratorResult<String> {
        let _guard = self.lock_session(session_id).await;

        let mut state = self.load_open(session_id).await?;
        let closing = closing_message(&state);
        state.close(reason, &closing)?;
        self.store
            .save(session_id, &state, self.config.state_ttl())
            .await?;

        info!(session_id = %session_id, reason = %reason, "Session ended");
        Ok(closing)
    }

    /// Start a new arc in an existing session. Works on closed sessions too;
    /// missing and expired sessions are rejected.
    pub async fn reset_arc(&self, session_id: &str, text: &str) -> OrchestratorResult<AgentResponse> {
        let text = self.validate_text(text)?;

        let _guard = self.lock_session(session_id).await;

        let mut state = self.load_existing(session_id).await?;
        if state.history.len() >= self.config.max_history_turns {
            return Err(ValidationError::HistoryFull {
                max: self.config.max_history_turns,
            }
            .into());
        }

        let prior = state.classification.category;
        let classification = self.classifier.classify(text, Some(prior));
        let concern = UserConcern::new(text, Some(state.next_turn_index()));
        state.reset_arc(concern, classification)?;

        let span = otel::turn_span(session_id, "reset", state.next_turn_index());
        let response = self.run_turn(&mut state).instrument(span).await?;

        self.store
            .save(session_id, &state, self.config.state_ttl())
            .await?;
        info!(session_id = %session_id, arc = state.arc, "Arc reset");
        Ok(response)
    }

    /// Summary of a session's anxiety progression. Read-only; works on
    /// closed sessions.
    pub async fn session_analytics(&self, session_id: &str) -> OrchestratorResult<ArcSummary> {
        let state = self.load_existing(session_id).await?;
        Ok(analytics::summarize(&state))
    }

    /// Drop expired sessions from the store.
    pub async fn purge_expired(&self) -> OrchestratorResult<usize> {
        let removed = self.store.purge_expired().await?;
        if removed > 0 {
            info!(removed, "Purged expired sessions");
        }
        Ok(removed)
    }

    // ── internals ────────────────────────────────────────────────────

    fn validate_text<'a>(&self, text: &'a str) -> Result<&'a str, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty);
        }
        let len = text.chars().count();
        if len > self.config.max_input_chars {
            return Err(ValidationError::TooLong {
                len,
                max: self.config.max_input_chars,
            });
        }
        Ok(text)
    }

    async fn lock_session(&self, session_id: &str) -> SessionGuard<'_> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(session_id.to_string()).or_default())
        };
        let mut slot = SessionGuard {
            locks: &self.locks,
            session_id: session_id.to_string(),
            guard: None,
        };
        slot.guard = Some(lock.lock_owned().await);
        slot
    }

    /// Number of sessions with a live turn lock.
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Load a session that exists and has not expired.
    async fn load_existing(&self, session_id: &str) -> OrchestratorResult<ConversationState> {
        let state = self
            .store
            .load(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found(session_id, NotFoundReason::Missing))?;
        if state.status == SessionStatus::Expired {
            return Err(OrchestratorError::not_found(session_id, NotFoundReason::Expired));
        }
        Ok(state)
    }

    /// Load a session that can still take turns.
    async fn load_open(&self, session_id: &str) -> OrchestratorResult<ConversationState> {
        let state = self.load_existing(session_id).await?;
        if state.status == SessionStatus::Closed {
            return Err(OrchestratorError::not_found(session_id, NotFoundReason::Closed));
        }
        Ok(state)
    }

    /// Run the active responder against `state` and apply the hand-off.
    /// Mutates only the local copy; the caller persists it.
    async fn run_turn(&self, state: &mut ConversationState) -> OrchestratorResult<AgentResponse> {
        let started = Instant::now();
        let active = state.active.ok_or_else(|| {
            OrchestratorError::not_found(&state.session_id, NotFoundReason::Closed)
        })?;
        let responder = self.registry.get(active);
        let readiness = responder.readiness(&state.history);

        let settings = GenerationSettings {
            timeout: self.config.generation_timeout(),
            max_output_tokens: self.config.max_output_tokens,
        };
        let mut rng = turn_rng(
            self.config.rng_seed,
            &state.session_id,
            state.next_turn_index(),
        );
        let ctx = TurnContext {
            concern: &state.concern,
            classification: &state.classification,
            history: &state.history,
            anxiety: state.anxiety,
        };
        let mut response = responder
            .generate(&ctx, self.generator.as_ref(), settings, &mut rng)
            .await;
        self.record_generation(&response);

        state.record_visit(active);
        let anxiety = state.raise_anxiety(response.anxiety_level);
        response.anxiety_level = anxiety;

        let processing_ms = response
            .metadata
            .get("processing_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or_default();
        state.push_turn(
            Turn::new(Speaker::Responder(active), response.content.clone(), anxiety)
                .with_processing_ms(processing_ms),
        );

        let recommended = response.next.responder().unwrap_or(ResponderId::FalseComfort);
        let decision = self.selector.select(&HandoffInput {
            phase: state.phase,
            category: state.classification.category,
            triggers: &state.classification.triggers,
            anxiety,
            visited: &state.visited,
            recommended,
            turns_taken: state.arc_turns,
        });

        let reason_label = decision.reason.to_string();
        otel::handoff_span(
            &state.session_id,
            active,
            &decision.next.to_string(),
            &reason_label,
        )
        .in_scope(|| {
            debug!(
                session_id = %state.session_id,
                from = %active,
                recommended = %recommended,
                next = %decision.next,
                reason = %decision.reason,
                "Hand-off decided"
            )
        });

        match decision.next {
            NextStep::Responder(next) => {
                if state.phase == ArcPhase::Intake {
                    state.transition(ArcPhase::Escalating, "intake complete")?;
                }
                state.active = Some(next);
            }
            NextStep::Terminal => {
                let closing = closing_message(state);
                state.close(&reason_label, &closing)?;
                response.closing = Some(closing);
                info!(
                    session_id = %state.session_id,
                    reason = %decision.reason,
                    turns = state.arc_turns,
                    "Arc closed"
                );
            }
        }

        response.next = decision.next;
        response.metadata.insert("handoff_reason".into(), json!(decision.reason));
        response.metadata.insert("readiness".into(), json!(readiness));
        response.metadata.insert("arc".into(), json!(state.arc));
        response.metadata.insert("arc_turn".into(), json!(state.arc_turns));

        otel::record_turn_result(
            &tracing::Span::current(),
            &active.to_string(),
            &anxiety.to_string(),
            !state.is_open(),
            started.elapsed().as_millis() as u64,
        );
        Ok(response)
    }

    fn record_generation(&self, response: &AgentResponse) {
        let fell_back = response
            .metadata
            .get("content_source")
            .and_then(|v| serde_json::from_value::<ContentSource>(v.clone()).ok())
            == Some(ContentSource::Fallback);

        let mut health = self
            .health
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = health.level;
        if fell_back {
            let error = response
                .metadata
                .get("generation_error")
                .and_then(|v| v.as_str())
                .unwrap_or("fallback");
            health.record_failure(error);
        } else {
            health.record_success();
        }
        let after = health.level;
        if before != after {
            warn!(from = %before, to = %after, "Generation backend health changed");
        }
    }
}

/// Closing line emitted when an arc reaches TERMINAL.
fn closing_message(state: &ConversationState) -> String {
    let voices: Vec<&str> = state
        .visited
        .iter()
        .filter(|id| **id != ResponderId::Intake)
        .map(|id| id.display_name())
        .collect();
    if voices.is_empty() {
        "That's all for now. Whatever happens next, it's probably less dramatic than it felt."
            .to_string()
    } else {
        format!(
            "That's all for now. You heard from {}. Whatever happens next, it's probably less \
             dramatic than we made it sound.",
            voices.join(", ")
        )
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("selector", &self.selector)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationError, MockGenerationService};
    use crate::lexicon::Lexicon;
    use crate::state::InMemoryStore;

    fn orchestrator(mock: MockGenerationService) -> Orchestrator {
        Orchestrator::new(
            OrchestratorConfig::seeded(7),
            Lexicon::builtin().shared(),
            Arc::new(mock),
            Arc::new(InMemoryStore::new()),
        )
    }

    fn echo() -> MockGenerationService {
        let mut mock = MockGenerationService::new();
        mock.expect_generate()
            .returning(|_, _, _| Ok("generated prose".to_string()));
        mock
    }

    #[test]
    fn test_turn_input_from_text() {
        assert_eq!(TurnInput::from_text("  "), TurnInput::Continue);
        assert_eq!(TurnInput::from_text("Continue"), TurnInput::Continue);
        assert_eq!(
            TurnInput::from_text(" still no reply "),
            TurnInput::Message("still no reply".into())
        );
    }

    #[tokio::test]
    async fn test_start_session_runs_intake() {
        let orch = orchestrator(echo());
        let (id, response) = orch
            .start_session("My friend hasn't texted me back in 2 hours")
            .await
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(response.responder, ResponderId::Intake);
        assert_eq!(response.anxiety_level, crate::types::AnxietyLevel::Calm);
        assert_ne!(response.next, NextStep::Responder(ResponderId::Intake));
        assert!(response.metadata.contains_key("opening_line"));
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_anything_runs() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate().never();
        let orch = orchestrator(mock);
        let err = orch.start_session("   ").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(ValidationError::Empty)));
    }

    #[tokio::test]
    async fn test_oversized_input_rejected() {
        let orch = orchestrator(echo());
        let text = "a".repeat(1001);
        let err = orch.start_session(&text).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_unknown_session_is_missing() {
        let orch = orchestrator(echo());
        let err = orch
            .continue_session("nope", TurnInput::Continue)
            .await
            .unwrap_err();
        assert!(err.requires_new_session());
        assert_eq!(err.kind(), "session_not_found");
    }

    #[tokio::test]
    async fn test_generation_failures_update_health() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate()
            .returning(|_, _, _| Err(GenerationError::Unavailable("down".into())));
        let orch = orchestrator(mock);
        let (id, _) = orch.start_session("my rent is due").await.unwrap();
        orch.continue_session(&id, TurnInput::Continue).await.unwrap();
        orch.continue_session(&id, TurnInput::Continue).await.unwrap();
        let health = orch.generation_health();
        assert_eq!(health.level, crate::generation::health::HealthLevel::Down);
        assert_eq!(health.total_failures, 3);
    }

    #[tokio::test]
    async fn test_end_session_then_continue_is_closed() {
        let orch = orchestrator(echo());
        let (id, _) = orch.start_session("my boss emailed me").await.unwrap();
        let closing = orch.end_session(&id, "user ended").await.unwrap();
        assert!(!closing.is_empty());
        let err = orch
            .continue_session(&id, TurnInput::Continue)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::SessionNotFound {
                reason: NotFoundReason::Closed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_reset_arc_restarts_at_intake() {
        let orch = orchestrator(echo());
        let (id, _) = orch.start_session("my boss emailed me").await.unwrap();
        orch.continue_session(&id, TurnInput::Continue).await.unwrap();
        let response = orch.reset_arc(&id, "now my tooth hurts").await.unwrap();
        assert_eq!(response.responder, ResponderId::Intake);
        assert_eq!(response.anxiety_level, crate::types::AnxietyLevel::Calm);
        assert_eq!(response.metadata["arc"], 2);
    }

    #[tokio::test]
    async fn test_readiness_recorded_in_metadata() {
        let orch = orchestrator(echo());
        let (id, first) = orch.start_session("my boss emailed me").await.unwrap();
        assert_eq!(first.metadata["readiness"]["ready"], false);

        let response = orch
            .continue_session(&id, TurnInput::Message("it's been since Monday".into()))
            .await
            .unwrap();
        assert_eq!(response.metadata["readiness"]["ready"], true);
    }

    #[tokio::test]
    async fn test_unknown_ids_leave_no_locks_behind() {
        let orch = orchestrator(echo());
        for i in 0..100 {
            let id = format!("bogus-{i}");
            assert!(orch.continue_session(&id, TurnInput::Continue).await.is_err());
            assert!(orch.end_session(&id, "done").await.is_err());
            assert!(orch.reset_arc(&id, "hello").await.is_err());
        }
        assert_eq!(orch.tracked_locks(), 0);

        let (id, _) = orch.start_session("my boss emailed me").await.unwrap();
        orch.continue_session(&id, TurnInput::Continue).await.unwrap();
        assert_eq!(orch.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_lock_entry_survives_while_awaited() {
        let orch = orchestrator(echo());
        let first = orch.lock_session("s-1").await;

        let second = orch.lock_session("s-1");
        tokio::pin!(second);
        assert!(futures::poll!(&mut second).is_pending());

        drop(first);
        assert_eq!(orch.tracked_locks(), 1);
        let second = second.await;

        let third = orch.lock_session("s-1");
        tokio::pin!(third);
        assert!(futures::poll!(&mut third).is_pending());

        drop(second);
        drop(third.await);
        assert_eq!(orch.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_resets_after_close_serialize() {
        let orch = orchestrator(echo());
        let (id, _) = orch.start_session("my friend ignored me").await.unwrap();
        orch.end_session(&id, "user ended").await.unwrap();

        let (a, b) = tokio::join!(
            orch.reset_arc(&id, "now my tooth hurts"),
            orch.reset_arc(&id, "and my rent is due")
        );
        a.unwrap();
        b.unwrap();

        let summary = orch.session_analytics(&id).await.unwrap();
        assert_eq!(summary.arc, 3);
        assert_eq!(orch.tracked_locks(), 0);
    }
}
