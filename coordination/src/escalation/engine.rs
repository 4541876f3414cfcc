//! Hand-off selector — deterministic choice of the next responder.
//!
//! Consumes the classification, anxiety level, visited set, and the active
//! responder's own recommendation. No I/O and no randomness: identical
//! inputs always produce the identical [`HandoffDecision`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::escalation::state::ArcPhase;
use crate::types::{AnxietyLevel, EscalationTrigger, NextStep, ResponderId, WorryCategory};

/// Default hard ceiling on responder turns per arc.
pub const DEFAULT_TURN_CEILING: u32 = 6;

/// Why the selector picked what it picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffReason {
    /// The active responder's recommendation was taken as-is.
    Recommended,
    /// Recommendation already visited; took the first open roster slot.
    RosterFallback,
    /// Anxiety hit EXTREME; closing the loop through false comfort.
    ExtremeAnxiety,
    /// Arc reached the turn ceiling.
    TurnCeiling,
    /// Every compatible responder has had a turn.
    Exhausted,
    /// Arc was already terminal.
    AlreadyTerminal,
}

impl std::fmt::Display for HandoffReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recommended => write!(f, "recommended"),
            Self::RosterFallback => write!(f, "roster_fallback"),
            Self::ExtremeAnxiety => write!(f, "extreme_anxiety"),
            Self::TurnCeiling => write!(f, "turn_ceiling"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::AlreadyTerminal => write!(f, "already_terminal"),
        }
    }
}

/// Everything the selector looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffInput<'a> {
    pub phase: ArcPhase,
    pub category: WorryCategory,
    pub triggers: &'a BTreeSet<EscalationTrigger>,
    pub anxiety: AnxietyLevel,
    pub visited: &'a BTreeSet<ResponderId>,
    /// What the responder that just spoke suggested.
    pub recommended: ResponderId,
    /// Responder turns completed in this arc, including the one just taken.
    pub turns_taken: u32,
}

/// Decision produced by the selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDecision {
    pub next: NextStep,
    pub reason: HandoffReason,
}

impl HandoffDecision {
    fn to(id: ResponderId, reason: HandoffReason) -> Self {
        Self {
            next: NextStep::Responder(id),
            reason,
        }
    }

    fn terminal(reason: HandoffReason) -> Self {
        Self {
            next: NextStep::Terminal,
            reason,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_terminal()
    }
}

/// Escalation responders compatible with a category, in priority order.
/// Every roster ends with false comfort, which closes the loop.
pub fn roster(category: WorryCategory) -> &'static [ResponderId] {
    use ResponderId::*;
    match category {
        WorryCategory::Social => &[SocialAnxiety, TimelinePanic, Probability, Catastrophe, FalseComfort],
        WorryCategory::Health => &[Catastrophe, Probability, TimelinePanic, SocialAnxiety, FalseComfort],
        WorryCategory::Career => &[TimelinePanic, Probability, Catastrophe, SocialAnxiety, FalseComfort],
        WorryCategory::Finances => &[Probability, Catastrophe, TimelinePanic, SocialAnxiety, FalseComfort],
        WorryCategory::Relationships => &[SocialAnxiety, Catastrophe, TimelinePanic, Probability, FalseComfort],
        WorryCategory::Technology => &[Catastrophe, Probability, TimelinePanic, SocialAnxiety, FalseComfort],
        WorryCategory::Existential | WorryCategory::General => &[Catastrophe, TimelinePanic, Probability, SocialAnxiety, FalseComfort],
    }
}

/// Responder a trigger pulls toward when the selector has to choose.
pub fn favoured_by(trigger: EscalationTrigger) -> ResponderId {
    match trigger {
        EscalationTrigger::TimeSensitive => ResponderId::TimelinePanic,
        EscalationTrigger::SocialJudgment => ResponderId::SocialAnxiety,
        EscalationTrigger::HealthAnxiety | EscalationTrigger::CatastrophicThinking => {
            ResponderId::Catastrophe
        }
        EscalationTrigger::Uncertainty => ResponderId::Probability,
    }
}

/// Pure hand-off selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffSelector {
    turn_ceiling: u32,
}

impl Default for HandoffSelector {
    fn default() -> Self {
        Self {
            turn_ceiling: DEFAULT_TURN_CEILING,
        }
    }
}

impl HandoffSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ceiling(turn_ceiling: u32) -> Self {
        Self {
            turn_ceiling: turn_ceiling.max(1),
        }
    }

    pub fn turn_ceiling(&self) -> u32 {
        self.turn_ceiling
    }

    /// Decide what follows the turn described by `input`.
    ///
    /// Order of rules:
    /// 1. terminal arcs stay terminal; the ceiling forces TERMINAL
    /// 2. from INTAKE the recommendation is followed
    /// 3. EXTREME anxiety routes to false comfort once, then TERMINAL
    /// 4. an unvisited recommendation is authoritative
    /// 5. otherwise the first open roster slot, or TERMINAL
    pub fn select(&self, input: &HandoffInput<'_>) -> HandoffDecision {
        if input.phase.is_terminal() {
            return HandoffDecision::terminal(HandoffReason::AlreadyTerminal);
        }
        if input.turns_taken >= self.turn_ceiling {
            return HandoffDecision::terminal(HandoffReason::TurnCeiling);
        }

        let open = |id: ResponderId| id != ResponderId::Intake && !input.visited.contains(&id);

        if input.phase == ArcPhase::Escalating && input.anxiety.is_extreme() {
            return if open(ResponderId::FalseComfort) {
                HandoffDecision::to(ResponderId::FalseComfort, HandoffReason::ExtremeAnxiety)
            } else {
                HandoffDecision::terminal(HandoffReason::ExtremeAnxiety)
            };
        }

        if open(input.recommended) {
            return HandoffDecision::to(input.recommended, HandoffReason::Recommended);
        }

        match first_open_slot(input.category, input.triggers, &open) {
            Some(id) => HandoffDecision::to(id, HandoffReason::RosterFallback),
            None => HandoffDecision::terminal(HandoffReason::Exhausted),
        }
    }
}

/// Trigger-favoured roster entries first, then the rest, each group in
/// roster order.
fn first_open_slot(
    category: WorryCategory,
    triggers: &BTreeSet<EscalationTrigger>,
    open: &dyn Fn(ResponderId) -> bool,
) -> Option<ResponderId> {
    let favoured: BTreeSet<ResponderId> = triggers.iter().map(|&t| favoured_by(t)).collect();
    let roster = roster(category);

    roster
        .iter()
        .filter(|id| favoured.contains(id))
        .chain(roster.iter().filter(|id| !favoured.contains(id)))
        .copied()
        .find(|&id| open(id))
}
