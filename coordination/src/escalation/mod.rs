//! Escalation arc — phase machine and hand-off selector.
//!
//! Pure decision logic with no generation calls and no persistence.
//!
//! # Arc
//!
//! ```text
//! INTAKE ── intake persona speaks once, never escalates
//!     │     next = intake's recommendation
//!     ▼
//! ESCALATING ── one responder turn per round
//!     │  recommendation unvisited     → take it
//!     │  recommendation visited       → first open roster slot (trigger-favoured first)
//!     │  anxiety EXTREME              → false comfort once, then close
//!     │  turn ceiling / roster empty  → close
//!     ▼
//! TERMINAL ── closing message, session CLOSED
//!     │
//!     └─ explicit reset ──▶ INTAKE (new arc, anxiety back to CALM)
//! ```

pub mod engine;
pub mod state;

pub use engine::{
    favoured_by, roster, HandoffDecision, HandoffInput, HandoffReason, HandoffSelector,
    DEFAULT_TURN_CEILING,
};
pub use state::{check_transition, ArcPhase, PhaseTransition, TransitionError};
