//! Arc phase — the three-state machine every escalation arc walks through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the current escalation arc.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcPhase {
    /// Intake persona has the floor; nothing has escalated yet.
    #[default]
    Intake,
    /// One or more escalation rounds.
    Escalating,
    /// Arc closed.
    Terminal,
}

impl ArcPhase {
    pub fn is_terminal(self) -> bool {
        self == Self::Terminal
    }

    /// Valid transitions from this phase. `Terminal → Intake` is the
    /// explicit arc reset.
    pub fn valid_transitions(self) -> &'static [ArcPhase] {
        match self {
            Self::Intake => &[Self::Escalating, Self::Terminal],
            Self::Escalating => &[Self::Terminal],
            Self::Terminal => &[Self::Intake],
        }
    }

    pub fn can_transition_to(self, to: ArcPhase) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for ArcPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::Escalating => write!(f, "escalating"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

/// A recorded phase change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: ArcPhase,
    pub to: ArcPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Rejected phase change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} → {to} (allowed: {allowed:?})")]
pub struct TransitionError {
    pub from: ArcPhase,
    pub to: ArcPhase,
    pub allowed: &'static [ArcPhase],
}

/// Check a transition and produce the record to append.
pub fn check_transition(
    from: ArcPhase,
    to: ArcPhase,
    reason: &str,
) -> Result<PhaseTransition, TransitionError> {
    if !from.can_transition_to(to) {
        return Err(TransitionError {
            from,
            to,
            allowed: from.valid_transitions(),
        });
    }
    Ok(PhaseTransition {
        from,
        to,
        timestamp: Utc::now(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        assert!(ArcPhase::Intake.can_transition_to(ArcPhase::Escalating));
        assert!(ArcPhase::Escalating.can_transition_to(ArcPhase::Terminal));
        assert!(ArcPhase::Terminal.is_terminal());
    }

    #[test]
    fn test_no_return_to_intake_mid_arc() {
        let err = check_transition(ArcPhase::Escalating, ArcPhase::Intake, "rewind").unwrap_err();
        assert_eq!(err.from, ArcPhase::Escalating);
        assert_eq!(err.allowed, &[ArcPhase::Terminal]);
    }

    #[test]
    fn test_reset_from_terminal() {
        let record = check_transition(ArcPhase::Terminal, ArcPhase::Intake, "new topic").unwrap();
        assert_eq!(record.to, ArcPhase::Intake);
        assert_eq!(record.reason, "new topic");
    }
}
