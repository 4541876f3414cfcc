//! Read-only session analytics derived from conversation history.
//!
//! Nothing here touches the store; the orchestrator loads a state and hands
//! it to [`summarize`].

pub mod arc;

pub use arc::{summarize, AnxietyEvent, AnxietyTrend, ArcSummary, EventKind};
