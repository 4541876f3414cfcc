//! Anxiety progression over a session's responder turns.
//!
//! ```text
//! responder turns ──▶ anxiety levels [0,1,3,3,4]
//!                        │
//!        consecutive deltas ─▶ events: +1 ESCALATION, +2 ESCALATION,
//!                        │             0 PLATEAU, +1 ESCALATION
//!                        ▼
//!        rises and falls both present → VOLATILE
//!        otherwise last vs first      → INCREASING / DECREASING / STABLE
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{ConversationState, SessionStatus};
use crate::types::{AnxietyLevel, ResponderId, SessionId};

/// Change of at least this many levels in one turn is a spike.
const SPIKE_THRESHOLD: i8 = 3;

/// Overall direction of anxiety across the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnxietyTrend {
    Increasing,
    Decreasing,
    Stable,
    Volatile,
}

impl std::fmt::Display for AnxietyTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increasing => write!(f, "increasing"),
            Self::Decreasing => write!(f, "decreasing"),
            Self::Stable => write!(f, "stable"),
            Self::Volatile => write!(f, "volatile"),
        }
    }
}

/// Classification of a single turn-to-turn change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// +1 or +2 levels.
    Escalation,
    /// +3 or more.
    Spike,
    /// No change.
    Plateau,
    /// Dropped; only happens across an arc reset.
    Recovery,
}

impl EventKind {
    fn classify(delta: i8) -> Self {
        if delta >= SPIKE_THRESHOLD {
            Self::Spike
        } else if delta > 0 {
            Self::Escalation
        } else if delta == 0 {
            Self::Plateau
        } else {
            Self::Recovery
        }
    }
}

/// One change between consecutive responder turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnxietyEvent {
    /// Index into the session history of the later turn.
    pub turn_index: usize,
    pub responder: ResponderId,
    pub from: AnxietyLevel,
    pub to: AnxietyLevel,
    pub kind: EventKind,
}

/// Summary of a session for the analytics view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcSummary {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub arc: u32,
    /// User and responder turns; system turns are not counted.
    pub turn_count: usize,
    pub responder_turns: usize,
    /// Responders in the order they first spoke.
    pub responders_visited: Vec<ResponderId>,
    pub peak_anxiety: AnxietyLevel,
    pub average_anxiety: f64,
    pub current_anxiety: AnxietyLevel,
    pub trend: AnxietyTrend,
    pub events: Vec<AnxietyEvent>,
    /// Total processing time per responder, from recorded turns.
    pub processing_ms: BTreeMap<ResponderId, u64>,
}

impl ArcSummary {
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] arc {} | {} turns ({} responder) | peak={} avg={:.1} now={} | trend={} | spikes={}",
            self.status,
            self.arc,
            self.turn_count,
            self.responder_turns,
            self.peak_anxiety,
            self.average_anxiety,
            self.current_anxiety,
            self.trend,
            self.count(EventKind::Spike),
        )
    }
}

/// Build the summary for `state`. Pure.
pub fn summarize(state: &ConversationState) -> ArcSummary {
    let responder_turns: Vec<(usize, ResponderId, AnxietyLevel)> = state
        .history
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.responder().map(|id| (i, id, t.anxiety)))
        .collect();

    let levels: Vec<AnxietyLevel> = responder_turns.iter().map(|(_, _, a)| *a).collect();

    let events: Vec<AnxietyEvent> = responder_turns
        .windows(2)
        .map(|pair| {
            let (_, _, from) = pair[0];
            let (turn_index, responder, to) = pair[1];
            let delta = to.as_u8() as i8 - from.as_u8() as i8;
            AnxietyEvent {
                turn_index,
                responder,
                from,
                to,
                kind: EventKind::classify(delta),
            }
        })
        .collect();

    let mut responders_visited = Vec::new();
    let mut processing_ms = BTreeMap::new();
    for turn in &state.history {
        let Some(id) = turn.responder() else { continue };
        if !responders_visited.contains(&id) {
            responders_visited.push(id);
        }
        if let Some(ms) = turn.processing_ms {
            *processing_ms.entry(id).or_insert(0) += ms;
        }
    }

    let average_anxiety = if levels.is_empty() {
        0.0
    } else {
        levels.iter().map(|a| f64::from(a.as_u8())).sum::<f64>() / levels.len() as f64
    };

    ArcSummary {
        session_id: state.session_id.clone(),
        status: state.status,
        arc: state.arc,
        turn_count: state
            .history
            .iter()
            .filter(|t| t.is_user() || t.responder().is_some())
            .count(),
        responder_turns: responder_turns.len(),
        responders_visited,
        peak_anxiety: levels.iter().copied().max().unwrap_or_default(),
        average_anxiety,
        current_anxiety: state.anxiety,
        trend: trend(&levels),
        events,
        processing_ms,
    }
}

fn trend(levels: &[AnxietyLevel]) -> AnxietyTrend {
    let (Some(first), Some(last)) = (levels.first(), levels.last()) else {
        return AnxietyTrend::Stable;
    };
    let rises = levels.windows(2).any(|w| w[1] > w[0]);
    let falls = levels.windows(2).any(|w| w[1] < w[0]);
    if rises && falls {
        AnxietyTrend::Volatile
    } else if last > first {
        AnxietyTrend::Increasing
    } else if last < first {
        AnxietyTrend::Decreasing
    } else {
        AnxietyTrend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classification, Speaker, Turn, UserConcern};

    fn state_with(levels: &[(ResponderId, AnxietyLevel, u64)]) -> ConversationState {
        let mut state = ConversationState::new(
            "s-1",
            UserConcern::new("worry", None),
            Classification::general(),
        );
        for (id, level, ms) in levels {
            state.push_turn(Turn::new(Speaker::Responder(*id), "...", *level).with_processing_ms(*ms));
        }
        state
    }

    #[test]
    fn test_increasing_arc_with_spike() {
        use AnxietyLevel::*;
        use ResponderId::*;
        let state = state_with(&[
            (Intake, Calm, 5),
            (Catastrophe, High, 10),
            (TimelinePanic, High, 20),
            (FalseComfort, Extreme, 30),
        ]);
        let summary = summarize(&state);
        assert_eq!(summary.trend, AnxietyTrend::Increasing);
        assert_eq!(summary.peak_anxiety, Extreme);
        assert_eq!(summary.count(EventKind::Spike), 1);
        assert_eq!(summary.count(EventKind::Plateau), 1);
        assert_eq!(summary.count(EventKind::Escalation), 1);
        assert_eq!(summary.responder_turns, 4);
        assert_eq!(summary.turn_count, 5);
        assert_eq!(summary.processing_ms[&Catastrophe], 10);
        assert!((summary.average_anxiety - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_makes_trend_volatile() {
        use AnxietyLevel::*;
        use ResponderId::*;
        let state = state_with(&[
            (Intake, Calm, 1),
            (Probability, High, 1),
            (Intake, Calm, 1),
            (Catastrophe, Moderate, 1),
        ]);
        let summary = summarize(&state);
        assert_eq!(summary.trend, AnxietyTrend::Volatile);
        assert_eq!(summary.count(EventKind::Recovery), 1);
        assert_eq!(summary.responders_visited, vec![Intake, Probability, Catastrophe]);
        assert_eq!(summary.processing_ms[&Intake], 2);
    }

    #[test]
    fn test_empty_history_is_stable() {
        let summary = summarize(&state_with(&[]));
        assert_eq!(summary.trend, AnxietyTrend::Stable);
        assert_eq!(summary.peak_anxiety, AnxietyLevel::Calm);
        assert!(summary.events.is_empty());
    }
}
