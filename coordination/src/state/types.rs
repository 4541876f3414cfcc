//! Conversation state — the session-scoped aggregate owned by the
//! orchestrator and persisted through a [`SessionStore`](super::SessionStore).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::{check_transition, ArcPhase, PhaseTransition, TransitionError};
use crate::types::{
    AnxietyLevel, Classification, ResponderId, SessionId, Speaker, Turn, UserConcern,
};

/// Current schema version for persisted state.
/// Bump when adding/removing/renaming fields.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    /// Arc reached TERMINAL or the session was ended explicitly.
    Closed,
    /// TTL elapsed since the last save.
    Expired,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Everything known about one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub version: u32,
    pub session_id: SessionId,
    /// Concern that opened the current arc.
    pub concern: UserConcern,
    /// Append-only.
    pub history: Vec<Turn>,
    pub anxiety: AnxietyLevel,
    /// Responders that have spoken in the current arc.
    pub visited: BTreeSet<ResponderId>,
    pub classification: Classification,
    pub phase: ArcPhase,
    /// Responder that takes the next turn. `None` once the arc is terminal.
    pub active: Option<ResponderId>,
    /// Responder turns taken in the current arc.
    pub arc_turns: u32,
    /// 1-indexed arc counter; bumped on explicit reset.
    pub arc: u32,
    pub status: SessionStatus,
    #[serde(default)]
    pub transitions: Vec<PhaseTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Fresh state for a new session. The opening user turn is recorded.
    pub fn new(session_id: impl Into<SessionId>, concern: UserConcern, classification: Classification) -> Self {
        let now = Utc::now();
        let opening = Turn::new(Speaker::User, concern.text.clone(), AnxietyLevel::Calm);
        Self {
            version: STATE_SCHEMA_VERSION,
            session_id: session_id.into(),
            concern,
            history: vec![opening],
            anxiety: AnxietyLevel::Calm,
            visited: BTreeSet::new(),
            classification,
            phase: ArcPhase::Intake,
            active: Some(ResponderId::Intake),
            arc_turns: 0,
            arc: 1,
            status: SessionStatus::Active,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Move the arc to a new phase, recording why.
    pub fn transition(&mut self, to: ArcPhase, reason: &str) -> Result<(), TransitionError> {
        let record = check_transition(self.phase, to, reason)?;
        self.transitions.push(record);
        self.phase = to;
        Ok(())
    }

    /// Append a turn. History is never edited or reordered.
    pub fn push_turn(&mut self, turn: Turn) {
        self.updated_at = turn.timestamp;
        self.history.push(turn);
    }

    /// Record the user's message with the current anxiety level.
    pub fn push_user_message(&mut self, text: &str) {
        let turn = Turn::new(Speaker::User, text, self.anxiety);
        self.push_turn(turn);
    }

    /// Raise anxiety to `proposed` if higher; never lowers it.
    pub fn raise_anxiety(&mut self, proposed: AnxietyLevel) -> AnxietyLevel {
        self.anxiety = self.anxiety.max(proposed);
        self.anxiety
    }

    /// Mark a responder as having spoken in this arc. Returns false if it
    /// had already spoken.
    pub fn record_visit(&mut self, responder: ResponderId) -> bool {
        self.arc_turns += 1;
        self.visited.insert(responder)
    }

    /// Close the arc and the session, appending the closing system turn.
    pub fn close(&mut self, reason: &str, closing: &str) -> Result<(), TransitionError> {
        if !self.phase.is_terminal() {
            self.transition(ArcPhase::Terminal, reason)?;
        }
        self.active = None;
        self.status = SessionStatus::Closed;
        let turn = Turn::new(Speaker::System, closing, self.anxiety);
        self.push_turn(turn);
        Ok(())
    }

    /// Start a new arc in this session. The only place anxiety goes down
    /// and the visited set is cleared.
    pub fn reset_arc(&mut self, concern: UserConcern, classification: Classification) -> Result<(), TransitionError> {
        if !self.phase.is_terminal() {
            self.transition(ArcPhase::Terminal, "arc reset")?;
        }
        self.transition(ArcPhase::Intake, "arc reset")?;
        self.arc += 1;
        self.arc_turns = 0;
        self.visited.clear();
        self.anxiety = AnxietyLevel::Calm;
        self.active = Some(ResponderId::Intake);
        self.status = SessionStatus::Active;
        self.classification = classification;
        let opening = Turn::new(Speaker::User, concern.text.clone(), self.anxiety);
        self.concern = concern;
        self.push_turn(opening);
        Ok(())
    }

    /// Text of the most recent user turn.
    pub fn last_user_message(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|t| t.is_user())
            .map(|t| t.content.as_str())
    }

    /// Index of the next history entry.
    pub fn next_turn_index(&self) -> usize {
        self.history.len()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}/{}] arc {} turn {} | anxiety={} | category={} | visited={} | next={}",
            self.status,
            self.phase,
            self.arc,
            self.arc_turns,
            self.anxiety,
            self.classification.category,
            self.visited.len(),
            self.active
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorryCategory;

    fn state() -> ConversationState {
        ConversationState::new(
            "s-1",
            UserConcern::new("my boss emailed", None),
            Classification {
                category: WorryCategory::Career,
                triggers: BTreeSet::new(),
            },
        )
    }

    #[test]
    fn test_new_state_starts_at_intake() {
        let s = state();
        assert_eq!(s.phase, ArcPhase::Intake);
        assert_eq!(s.active, Some(ResponderId::Intake));
        assert_eq!(s.history.len(), 1);
        assert!(s.history[0].is_user());
        assert!(s.is_open());
    }

    #[test]
    fn test_anxiety_never_lowers() {
        let mut s = state();
        assert_eq!(s.raise_anxiety(AnxietyLevel::High), AnxietyLevel::High);
        assert_eq!(s.raise_anxiety(AnxietyLevel::Mild), AnxietyLevel::High);
    }

    #[test]
    fn test_close_appends_system_turn() {
        let mut s = state();
        s.transition(ArcPhase::Escalating, "intake done").unwrap();
        s.close("ceiling", "That's all for now.").unwrap();
        assert_eq!(s.status, SessionStatus::Closed);
        assert_eq!(s.phase, ArcPhase::Terminal);
        assert_eq!(s.active, None);
        assert_eq!(s.history.last().unwrap().speaker, Speaker::System);
        assert_eq!(s.transitions.len(), 2);
    }

    #[test]
    fn test_reset_arc_clears_visited_and_anxiety() {
        let mut s = state();
        s.record_visit(ResponderId::Intake);
        s.raise_anxiety(AnxietyLevel::Extreme);
        s.transition(ArcPhase::Escalating, "go").unwrap();

        s.reset_arc(
            UserConcern::new("new worry", Some(3)),
            Classification::general(),
        )
        .unwrap();

        assert_eq!(s.arc, 2);
        assert!(s.visited.is_empty());
        assert_eq!(s.anxiety, AnxietyLevel::Calm);
        assert_eq!(s.phase, ArcPhase::Intake);
        assert_eq!(s.last_user_message(), Some("new worry"));
    }

    #[test]
    fn test_record_visit_reports_repeat() {
        let mut s = state();
        assert!(s.record_visit(ResponderId::Intake));
        assert!(!s.record_visit(ResponderId::Intake));
        assert_eq!(s.arc_turns, 2);
    }
}
