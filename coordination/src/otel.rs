//! OpenTelemetry-Compatible Span Helpers
//!
//! Structured `tracing` span builders for the conversation pipeline. Field
//! names use dot notation so an OTel exporter can pick them up unchanged.
//!
//! # Span Hierarchy
//!
//! ```text
//! spiral.turn              (one per orchestrator call that runs a responder)
//!   ├─ spiral.generation   (one generation call, bounded by timeout)
//!   └─ spiral.handoff      (selector decision, point in time)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use coordination::otel;
//!
//! let span = otel::turn_span("3f1c...", "continue", 4);
//! // ... run the responder inside the span ...
//! otel::record_turn_result(&span, "probability", "high", false, 37);
//! ```

use tracing::Span;

use crate::generation::ContentSource;
use crate::types::ResponderId;

// ── Span Name Constants ──────────────────────────────────────────────

pub const SPAN_TURN: &str = "spiral.turn";
pub const SPAN_GENERATION: &str = "spiral.generation";
pub const SPAN_HANDOFF: &str = "spiral.handoff";

// ── Field Name Constants ─────────────────────────────────────────────

pub const FIELD_SESSION_ID: &str = "session.id";
pub const FIELD_OPERATION: &str = "spiral.operation";
pub const FIELD_TURN_INDEX: &str = "spiral.turn.index";
pub const FIELD_RESPONDER: &str = "spiral.responder";
pub const FIELD_ANXIETY: &str = "spiral.anxiety";
pub const FIELD_CLOSED: &str = "spiral.closed";
pub const FIELD_DURATION_MS: &str = "spiral.duration_ms";
pub const FIELD_MAX_TOKENS: &str = "spiral.generation.max_tokens";
pub const FIELD_SOURCE: &str = "spiral.generation.source";
pub const FIELD_NEXT: &str = "spiral.handoff.next";
pub const FIELD_REASON: &str = "spiral.handoff.reason";

// ── Span Builders ────────────────────────────────────────────────────

/// Span for one orchestrator turn.
///
/// Fields filled later via [`record_turn_result`]: responder, anxiety,
/// closed flag, duration.
pub fn turn_span(session_id: &str, operation: &str, turn_index: usize) -> Span {
    tracing::info_span!(
        "spiral.turn",
        "session.id" = %session_id,
        "spiral.operation" = %operation,
        "spiral.turn.index" = turn_index as u64,
        "spiral.responder" = tracing::field::Empty,
        "spiral.anxiety" = tracing::field::Empty,
        "spiral.closed" = tracing::field::Empty,
        "spiral.duration_ms" = tracing::field::Empty,
    )
}

pub fn record_turn_result(
    span: &Span,
    responder: &str,
    anxiety: &str,
    closed: bool,
    duration_ms: u64,
) {
    span.record(FIELD_RESPONDER, responder);
    span.record(FIELD_ANXIETY, anxiety);
    span.record(FIELD_CLOSED, closed);
    span.record(FIELD_DURATION_MS, duration_ms);
}

/// Span for a single generation call.
pub fn generation_span(responder: ResponderId, max_tokens: u32) -> Span {
    tracing::debug_span!(
        "spiral.generation",
        "spiral.responder" = %responder,
        "spiral.generation.max_tokens" = max_tokens,
        "spiral.generation.source" = tracing::field::Empty,
        "spiral.duration_ms" = tracing::field::Empty,
    )
}

pub fn record_generation_result(span: &Span, source: ContentSource, duration_ms: u64) {
    span.record(FIELD_SOURCE, tracing::field::display(source));
    span.record(FIELD_DURATION_MS, duration_ms);
}

/// Span for a hand-off decision. All fields filled at creation.
pub fn handoff_span(session_id: &str, from: ResponderId, next: &str, reason: &str) -> Span {
    tracing::info_span!(
        "spiral.handoff",
        "session.id" = %session_id,
        "spiral.responder" = %from,
        "spiral.handoff.next" = %next,
        "spiral.handoff.reason" = %reason,
    )
}
