//! Dr. Comfort McBackstab: reassurance that turns on itself halfway through.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::json;

use super::{build_prompt, indicator_readiness, pick, Draft, Responder, TurnContext};
use crate::lexicon::SharedLexicon;
use crate::types::{AnxietyLevel, Metadata, Readiness, ResponderId, Turn, WorryCategory};

/// Comfort, the exception that undoes it, and the line that lands the blow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reversal {
    comfort: &'static str,
    undermining: &'static str,
    devastation: &'static str,
}

const GENERAL: &[Reversal] = &[
    Reversal {
        comfort: "I understand you're worried, and that's completely normal.",
        undermining: "But what if your worry is actually your intuition trying to warn you about something real?",
        devastation: "Sometimes our subconscious picks up on danger signs that our conscious mind hasn't processed yet.",
    },
    Reversal {
        comfort: "Most people go through situations like this and everything turns out fine.",
        undermining: "However, you might be in that small percentage where things don't work out normally.",
        devastation: "The people who say 'everything will be fine' are usually the ones who haven't experienced real consequences.",
    },
    Reversal {
        comfort: "You're probably overthinking this, and that's okay.",
        undermining: "Although, what if you're not overthinking, but under-thinking the full scope of the problem?",
        devastation: "Sometimes the people who think they're overthinking are the only ones seeing the situation clearly.",
    },
];

fn reversals(category: WorryCategory) -> &'static [Reversal] {
    match category {
        WorryCategory::Social | WorryCategory::Relationships => &[
            Reversal {
                comfort: "True friends will understand and forgive social awkwardness.",
                undermining: "But what if this particular situation crosses a line that even understanding friends can't overlook?",
                devastation: "Sometimes the people who seem most understanding are just being polite.",
            },
            Reversal {
                comfort: "People are usually too focused on their own lives to judge you as harshly as you think.",
                undermining: "However, what if your situation is unusual enough that it does capture their attention?",
                devastation: "The times people do pay attention are usually when something is going notably wrong.",
            },
        ],
        WorryCategory::Health => &[
            Reversal {
                comfort: "Most symptoms like this are completely harmless and resolve on their own.",
                undermining: "But what if you're in the small percentage where minor symptoms mean something serious?",
                devastation: "By the time anyone catches it, the early intervention window may have closed.",
            },
            Reversal {
                comfort: "Health anxiety often makes symptoms seem worse than they are.",
                undermining: "Although, what if your anxiety is your body's way of telling you something is genuinely wrong?",
                devastation: "Sometimes anxiety isn't irrational. Sometimes it's an early warning system.",
            },
        ],
        WorryCategory::Career => &[
            Reversal {
                comfort: "Most workplace conflicts blow over quickly and don't affect long-term prospects.",
                undermining: "But what if this particular situation is being documented and will follow you?",
                devastation: "Professional reputation damage spreads across industries faster than ever.",
            },
            Reversal {
                comfort: "Career setbacks are often temporary and can lead to better opportunities.",
                undermining: "Although, what if this setback happens at a critical time that permanently alters your trajectory?",
                devastation: "Timing can be the difference between recovery and permanent damage.",
            },
        ],
        _ => GENERAL,
    }
}

const EXCEPTIONS: &[&str] = &[
    "Most people are fine, but what if you're the statistical outlier?",
    "That's comforting, but what if this is happening at the worst possible time?",
    "That sounds right, but what if there's something you don't know?",
    "That's comforting for normal problems, but what if this isn't normal?",
];

const OPENING_LINES: &[&str] = &[
    "Hi there, I'm here to make you feel better. Mostly.",
    "Take a deep breath. Everything is probably fine.",
];

pub struct FalseComfortResponder {
    lexicon: SharedLexicon,
}

impl FalseComfortResponder {
    pub fn new(lexicon: SharedLexicon) -> Self {
        Self { lexicon }
    }

    fn next_for(category: WorryCategory) -> ResponderId {
        match category {
            WorryCategory::Social => ResponderId::Catastrophe,
            _ => ResponderId::TimelinePanic,
        }
    }
}

#[async_trait]
impl Responder for FalseComfortResponder {
    fn id(&self) -> ResponderId {
        ResponderId::FalseComfort
    }

    fn persona_hint(&self) -> &'static str {
        "You are Dr. Comfort McBackstab. Begin warmly and reassuringly, then \
         undercut your own reassurance with a gentle 'but what if' that makes things \
         worse. Stay soft-spoken throughout while the content grows more unsettling. \
         Keep it to three or four sentences."
    }

    fn opening_lines(&self) -> &'static [&'static str] {
        OPENING_LINES
    }

    fn fallback_line(&self) -> &'static str {
        "I'm sorry about this technical error. But what if this malfunction is a sign of \
         bigger problems ahead? Technology can fail when you need it most."
    }

    fn compose(&self, ctx: &TurnContext<'_>, rng: &mut StdRng) -> Draft {
        let category = ctx.classification.category;
        let bank = reversals(category);
        let reversal = bank.choose(rng).copied().unwrap_or(GENERAL[0]);
        let exception = pick(rng, EXCEPTIONS);

        let body = format!(
            "{}\n\n{} {}\n\n{}",
            reversal.comfort, reversal.undermining, exception, reversal.devastation
        );

        let prompt = build_prompt(
            ctx,
            "Reassure the user, then undermine the reassurance with a worrying exception.",
            &format!("Comfort: {}\nException: {}", reversal.comfort, reversal.undermining),
        );

        let mut metadata = Metadata::new();
        metadata.insert("comfort".into(), json!(reversal.comfort));
        metadata.insert("exception".into(), json!(exception));

        Draft {
            prompt,
            body,
            anxiety: AnxietyLevel::Extreme,
            recommended: Self::next_for(category),
            strategy: "comfort_followed_by_exceptions",
            metadata,
        }
    }

    fn readiness(&self, history: &[Turn]) -> Readiness {
        indicator_readiness(history, &self.lexicon)
    }
}
