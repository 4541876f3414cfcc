//! Responder personas.
//!
//! Every persona implements [`Responder`]: it composes a [`Draft`] from the
//! turn context (pure, driven by an injected RNG), then the provided
//! [`Responder::generate`] asks the generation service for prose and falls
//! back to the persona's canned line when that fails.
//!
//! ```text
//! TurnContext ──compose(rng)──▶ Draft { prompt, body, anxiety, recommended }
//!                                  │
//!                    generation ◀──┘ (bounded by timeout)
//!                       │ ok  → prose
//!                       │ err → canned line + warn!
//!                       ▼
//!                  AgentResponse { content = prose/canned + body, metadata }
//! ```

pub mod catastrophe;
pub mod comfort;
pub mod intake;
pub mod probability;
pub mod registry;
pub mod social;
pub mod timeline;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::json;
use tracing::{warn, Instrument};

use crate::generation::{generate_with_timeout, ContentSource, GenerationService};
use crate::lexicon::Lexicon;
use crate::otel;
use crate::types::{
    AgentResponse, AnxietyLevel, Classification, Metadata, NextStep, Readiness, ResponderId,
    Turn, UserConcern,
};

pub use catastrophe::CatastropheResponder;
pub use comfort::FalseComfortResponder;
pub use intake::IntakeResponder;
pub use probability::ProbabilityResponder;
pub use registry::ResponderRegistry;
pub use social::SocialAnxietyResponder;
pub use timeline::TimelinePanicResponder;

/// What a responder sees when it takes a turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub concern: &'a UserConcern,
    pub classification: &'a Classification,
    pub history: &'a [Turn],
    /// Session anxiety before this turn.
    pub anxiety: AnxietyLevel,
}

/// A persona's plan for its turn, before any generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    /// User message sent to the generation service.
    pub prompt: String,
    /// Template-bank text appended after the prose. May be empty.
    pub body: String,
    pub anxiety: AnxietyLevel,
    pub recommended: ResponderId,
    /// Which strategy fired, for the metadata sink.
    pub strategy: &'static str,
    pub metadata: Metadata,
}

/// Limits applied to the generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSettings {
    pub timeout: Duration,
    pub max_output_tokens: u32,
}

/// Shared contract for the six personas.
#[async_trait]
pub trait Responder: Send + Sync {
    fn id(&self) -> ResponderId;

    /// System prompt passed to the generation service as the persona hint.
    fn persona_hint(&self) -> &'static str;

    /// Lines used to greet a new session.
    fn opening_lines(&self) -> &'static [&'static str];

    /// Canned prose used when generation fails.
    fn fallback_line(&self) -> &'static str;

    /// Plan the turn. Deterministic for a given RNG state.
    fn compose(&self, ctx: &TurnContext<'_>, rng: &mut StdRng) -> Draft;

    /// Whether the conversation has given this persona enough to hand off.
    fn readiness(&self, history: &[Turn]) -> Readiness;

    /// Produce the turn's response. Never fails: generation problems are
    /// logged and replaced by [`Responder::fallback_line`].
    async fn generate(
        &self,
        ctx: &TurnContext<'_>,
        generator: &dyn GenerationService,
        settings: GenerationSettings,
        rng: &mut StdRng,
    ) -> AgentResponse {
        let started = Instant::now();
        let draft = self.compose(ctx, rng);
        let responder = self.id();

        let span = otel::generation_span(responder, settings.max_output_tokens);
        let result = generate_with_timeout(
            generator,
            &draft.prompt,
            settings.max_output_tokens,
            self.persona_hint(),
            settings.timeout,
        )
        .instrument(span.clone())
        .await;

        let mut metadata = draft.metadata;
        let (prose, source) = match result {
            Ok(text) => (text, ContentSource::Generated),
            Err(e) => {
                warn!(responder = %responder, error = %e, "Generation failed; using canned fallback");
                metadata.insert("generation_error".into(), json!(e.to_string()));
                (self.fallback_line().to_string(), ContentSource::Fallback)
            }
        };
        otel::record_generation_result(&span, source, started.elapsed().as_millis() as u64);

        let content = if draft.body.is_empty() {
            prose
        } else {
            format!("{prose}\n\n{}", draft.body)
        };

        metadata.insert("strategy".into(), json!(draft.strategy));
        metadata.insert("content_source".into(), json!(source));
        metadata.insert("recommended_next".into(), json!(draft.recommended));
        metadata.insert("category".into(), json!(ctx.classification.category));
        metadata.insert("triggers".into(), json!(ctx.classification.triggers));
        metadata.insert(
            "processing_ms".into(),
            json!(started.elapsed().as_millis() as u64),
        );

        AgentResponse {
            responder,
            content,
            anxiety_level: draft.anxiety,
            next: NextStep::Responder(draft.recommended),
            closing: None,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// RNG for one turn. With a seed the stream depends only on the seed,
/// session id, and turn index.
pub fn turn_rng(seed: Option<u64>, session_id: &str, turn_index: usize) -> StdRng {
    match seed {
        Some(seed) => {
            let mixed = seed
                ^ fnv1a(session_id.as_bytes())
                ^ (turn_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            StdRng::seed_from_u64(mixed)
        }
        None => StdRng::from_entropy(),
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Pick one entry of a phrase bank.
pub(crate) fn pick<'a>(rng: &mut StdRng, bank: &[&'a str]) -> &'a str {
    bank.choose(rng).copied().unwrap_or_default()
}

/// User messages needed before any persona considers itself ready.
const MIN_USER_MESSAGES: usize = 2;

/// Indicator-keyword readiness over the last user message.
///
/// Fewer than two user turns → not ready (0.3); an indicator keyword in the
/// last user message → ready (0.8); otherwise not ready (0.5).
pub(crate) fn indicator_readiness(history: &[Turn], lexicon: &Lexicon) -> Readiness {
    let user_turns: Vec<&Turn> = history.iter().filter(|t| t.is_user()).collect();
    if user_turns.len() < MIN_USER_MESSAGES {
        return Readiness {
            ready: false,
            reason: "Need more information".to_string(),
            confidence: 0.3,
        };
    }

    let last = user_turns
        .last()
        .map(|t| t.content.to_lowercase())
        .unwrap_or_default();
    match lexicon
        .readiness_indicators()
        .iter()
        .find(|kw| last.contains(kw.as_str()))
    {
        Some(kw) => Readiness {
            ready: true,
            reason: format!("User provided context (\"{kw}\")"),
            confidence: 0.8,
        },
        None => Readiness {
            ready: false,
            reason: "Continue gathering information".to_string(),
            confidence: 0.5,
        },
    }
}

/// Shared prompt layout: the concern, classification, recent turns, and
/// persona-specific material.
pub(crate) fn build_prompt(ctx: &TurnContext<'_>, instruction: &str, material: &str) -> String {
    let triggers: Vec<String> = ctx
        .classification
        .triggers
        .iter()
        .map(ToString::to_string)
        .collect();
    let recent: Vec<String> = ctx
        .history
        .iter()
        .rev()
        .take(4)
        .rev()
        .map(|t| {
            let who = match t.speaker {
                crate::types::Speaker::User => "user".to_string(),
                crate::types::Speaker::Responder(id) => id.to_string(),
                crate::types::Speaker::System => "system".to_string(),
            };
            format!("{who}: {}", t.content)
        })
        .collect();

    let mut prompt = format!(
        "Worry: {}\nCategory: {}\nTriggers: {}\nCurrent anxiety: {}\n",
        ctx.concern.text,
        ctx.classification.category,
        if triggers.is_empty() {
            "none".to_string()
        } else {
            triggers.join(", ")
        },
        ctx.anxiety,
    );
    if !recent.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for line in recent {
            prompt.push_str("  ");
            prompt.push_str(&line);
            prompt.push('\n');
        }
    }
    if !material.is_empty() {
        prompt.push_str("Material:\n");
        prompt.push_str(material);
        prompt.push('\n');
    }
    prompt.push_str(instruction);
    prompt
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeSet;

    use super::*;
    use crate::types::{EscalationTrigger, Speaker, WorryCategory};

    /// Owned backing data for a [`TurnContext`].
    pub struct Fixture {
        pub concern: UserConcern,
        pub classification: Classification,
        pub history: Vec<Turn>,
        pub anxiety: AnxietyLevel,
    }

    impl Fixture {
        pub fn new(text: &str, category: WorryCategory, triggers: &[EscalationTrigger]) -> Self {
            Self {
                concern: UserConcern::new(text, None),
                classification: Classification {
                    category,
                    triggers: triggers.iter().copied().collect::<BTreeSet<_>>(),
                },
                history: vec![Turn::new(Speaker::User, text, AnxietyLevel::Calm)],
                anxiety: AnxietyLevel::Calm,
            }
        }

        pub fn with_anxiety(mut self, anxiety: AnxietyLevel) -> Self {
            self.anxiety = anxiety;
            self
        }

        pub fn ctx(&self) -> TurnContext<'_> {
            TurnContext {
                concern: &self.concern,
                classification: &self.classification,
                history: &self.history,
                anxiety: self.anxiety,
            }
        }
    }

    pub fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }
}
