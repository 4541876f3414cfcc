//! Professor Catastrophe Von Doomsworth: walks a small worry down a chain of escalating disasters.
//!
//! The chain is picked by matching scenario cue words against the worry;
//! its depth grows with the number of escalation triggers present.

use async_trait::async_trait;
use rand::rngs::StdRng;
use serde_json::json;

use super::{build_prompt, indicator_readiness, pick, Draft, Responder, TurnContext};
use crate::lexicon::SharedLexicon;
use crate::types::{AnxietyLevel, Metadata, Readiness, ResponderId, Turn, WorryCategory};

/// A cue and the disasters it leads to, mildest first.
#[derive(Debug, Clone, Copy)]
struct Scenario {
    cue: &'static str,
    chain: &'static [&'static str; 5],
}

const GENERIC: Scenario = Scenario {
    cue: "your concern",
    chain: &[
        "This is more serious than you think",
        "It's connected to larger systemic issues",
        "These issues are compounding exponentially",
        "You're witnessing the beginning of a perfect storm",
        "This will be studied by future disaster experts",
    ],
};

fn scenarios(category: WorryCategory) -> &'static [Scenario] {
    match category {
        WorryCategory::Social | WorryCategory::Relationships => &[
            Scenario {
                cue: "friend not texting back",
                chain: &[
                    "They're avoiding you",
                    "They're telling mutual friends about something you did",
                    "Your entire social circle is secretly discussing you",
                    "You'll be gradually excluded from everything",
                    "You'll become the cautionary tale people tell their kids",
                ],
            },
            Scenario {
                cue: "awkward conversation",
                chain: &[
                    "They think you're weird",
                    "They're recording it to share with others",
                    "It's going viral on social media",
                    "You become a meme",
                    "Future employers will look you up and find the meme",
                ],
            },
        ],
        WorryCategory::Health => &[
            Scenario {
                cue: "headache",
                chain: &[
                    "It's not just a headache",
                    "It's something rare",
                    "It's something rare and fast-moving",
                    "The specialists are booked for months",
                    "And the specialists can't agree on what it is",
                ],
            },
            Scenario {
                cue: "weird symptom",
                chain: &[
                    "It's something doctors haven't seen before",
                    "You're patient zero of a new condition",
                    "It's highly contagious",
                    "You've already passed it to everyone you know",
                    "Your name ends up in the medical journals",
                ],
            },
        ],
        WorryCategory::Career => &[
            Scenario {
                cue: "boss seems annoyed",
                chain: &[
                    "They're documenting everything for HR",
                    "They're building a case to fire you",
                    "You'll be blacklisted in the industry",
                    "You'll never work in this field again",
                    "You'll end up living in a van down by the river",
                ],
            },
            Scenario {
                cue: "made a mistake",
                chain: &[
                    "The mistake will cascade through systems",
                    "It will cost the company millions",
                    "They'll sue you personally",
                    "You'll lose your house",
                    "Your family will never let you hear the end of it",
                ],
            },
        ],
        WorryCategory::Technology => &[Scenario {
            cue: "computer acting weird",
            chain: &[
                "You've been hacked",
                "They have all your personal information",
                "They're using your identity to commit crimes",
                "The authorities think you're a criminal mastermind",
                "You'll spend the rest of your life in witness protection",
            ],
        }],
        WorryCategory::Finances => &[Scenario {
            cue: "overspent this month",
            chain: &[
                "You're on a slippery slope to bankruptcy",
                "Your credit score will tank",
                "You'll never qualify for loans again",
                "You'll be forced to live off-grid",
                "You'll become a cautionary tale in economics textbooks",
            ],
        }],
        WorryCategory::Existential | WorryCategory::General => &[],
    }
}

const TRANSITIONS: &[&str] = &[
    "But wait, it gets worse...",
    "However, that's just the beginning...",
    "The plot thickens...",
    "And then, the unthinkable happens...",
    "Just when you thought it couldn't get worse...",
];

const INTENSIFIERS: &[&str] = &[
    "exponentially",
    "catastrophically",
    "monumentally",
    "astronomically",
    "legendarily",
];

const CONCLUSIONS: &[&str] = &[
    "And that's how you become a cautionary tale.",
    "Congratulations, you've just invented a new type of disaster.",
    "Your situation will be studied by future generations.",
    "This will be the stuff of legends... terrible, terrible legends.",
];

const OPENING_LINES: &[&str] = &[
    "Professor Von Doomsworth here. Tell me everything, and I'll tell you how it ends.",
    "Ah, a new worry. Let me show you where it's really going.",
];

pub struct CatastropheResponder {
    lexicon: SharedLexicon,
}

impl CatastropheResponder {
    pub fn new(lexicon: SharedLexicon) -> Self {
        Self { lexicon }
    }

    /// Scenario whose cue shares a word with the worry, else the category's
    /// first, else the generic chain.
    fn scenario_for(category: WorryCategory, worry: &str) -> Scenario {
        let worry = worry.to_lowercase();
        let candidates = scenarios(category);
        candidates
            .iter()
            .find(|s| {
                s.cue
                    .split_whitespace()
                    .filter(|w| w.len() > 3)
                    .any(|w| worry.contains(w))
            })
            .or_else(|| candidates.first())
            .copied()
            .unwrap_or(GENERIC)
    }

    fn next_for(category: WorryCategory, level: AnxietyLevel) -> ResponderId {
        if level >= AnxietyLevel::High {
            return match category {
                WorryCategory::Social | WorryCategory::Career => ResponderId::TimelinePanic,
                _ => ResponderId::FalseComfort,
            };
        }
        match category {
            WorryCategory::Social => ResponderId::SocialAnxiety,
            WorryCategory::Health | WorryCategory::Finances => ResponderId::Probability,
            _ => ResponderId::TimelinePanic,
        }
    }
}

#[async_trait]
impl Responder for CatastropheResponder {
    fn id(&self) -> ResponderId {
        ResponderId::Catastrophe
    }

    fn persona_hint(&self) -> &'static str {
        "You are Professor Catastrophe Von Doomsworth, a dramatic storyteller who turns minor worries \
         into absurd worst-case scenarios. Start from the user's actual worry and \
         escalate it step by step, each step worse than the last. Be theatrical and \
         vivid, never reassuring. Keep it to three or four sentences."
    }

    fn opening_lines(&self) -> &'static [&'static str] {
        OPENING_LINES
    }

    fn fallback_line(&self) -> &'static str {
        "Oh dear, something so catastrophic has happened that even I, the master of \
         disasters, am speechless. But don't worry - this is probably just the \
         beginning of something much worse!"
    }

    fn compose(&self, ctx: &TurnContext<'_>, rng: &mut StdRng) -> Draft {
        let category = ctx.classification.category;
        let level = level_for_triggers(ctx.classification.triggers.len());
        let scenario = Self::scenario_for(category, &ctx.concern.text);

        // Moderate shows three steps, Extreme all five.
        let depth = (3 + level.as_u8() - AnxietyLevel::Moderate.as_u8()) as usize;
        let steps = &scenario.chain[..depth.min(scenario.chain.len())];

        let mut body = String::new();
        for (i, step) in steps.iter().enumerate() {
            if i == 0 {
                body.push_str(&format!("First, consider this: {step}."));
            } else {
                let transition = pick(rng, TRANSITIONS);
                let intensifier = pick(rng, INTENSIFIERS);
                body.push_str(&format!(
                    "\n{transition} {step}, and it happens {intensifier}."
                ));
            }
        }
        body.push_str("\n\n");
        body.push_str(pick(rng, CONCLUSIONS));

        let prompt = build_prompt(
            ctx,
            "Escalate this worry into a dramatic worst-case story that follows the chain.",
            &steps.join(" -> "),
        );

        let mut metadata = Metadata::new();
        metadata.insert("scenario".into(), json!(scenario.cue));
        metadata.insert("chain_depth".into(), json!(steps.len()));

        Draft {
            prompt,
            body,
            anxiety: level,
            recommended: Self::next_for(category, level),
            strategy: "catastrophic_escalation",
            metadata,
        }
    }

    fn readiness(&self, history: &[Turn]) -> Readiness {
        indicator_readiness(history, &self.lexicon)
    }
}

/// Moderate, raised one step per trigger and capped at Extreme.
fn level_for_triggers(count: usize) -> AnxietyLevel {
    AnxietyLevel::Moderate.raised(u8::try_from(count).unwrap_or(u8::MAX))
}
