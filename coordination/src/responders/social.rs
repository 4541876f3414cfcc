//! Professor Socially Awkward Von Judgmental: everyone noticed, and they are talking about it.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use serde_json::json;

use super::{build_prompt, indicator_readiness, pick, Draft, Responder, TurnContext};
use crate::lexicon::SharedLexicon;
use crate::types::{
    AnxietyLevel, EscalationTrigger, Metadata, Readiness, ResponderId, Turn, WorryCategory,
};

/// A named conspiracy, matched by cue words in the worry.
#[derive(Debug, Clone, Copy)]
struct Conspiracy {
    name: &'static str,
    cues: &'static [&'static str],
    chain: &'static [&'static str],
}

const CONSPIRACIES: &[Conspiracy] = &[
    Conspiracy {
        name: "The Group Chat Conspiracy",
        cues: &["text", "message", "respond", "call", "reply"],
        chain: &[
            "There's a group chat without you discussing this",
            "They're analyzing your every message for red flags",
            "They're taking screenshots for social evidence",
            "You're being quietly left off the next plan",
        ],
    },
    Conspiracy {
        name: "The Awkward Moment Amplification",
        cues: &["awkward", "embarrass", "weird", "stupid", "cringe"],
        chain: &[
            "Everyone noticed your awkward comment",
            "They're replaying it in their minds",
            "They're sharing it with people who weren't there",
            "You're now known as 'the person who said that thing'",
        ],
    },
    Conspiracy {
        name: "The Digital Social Audit",
        cues: &["post", "social media", "instagram", "photo", "comment"],
        chain: &[
            "They're analyzing your social media presence",
            "They're finding problematic patterns in your posts",
            "They're sharing their analysis with others",
            "Your digital footprint is being used against you socially",
        ],
    },
    Conspiracy {
        name: "The Social Event Evaluation",
        cues: &["party", "event", "gathering", "hangout", "meeting", "dinner"],
        chain: &[
            "Everyone is watching how you interact",
            "They're comparing you to others at the event",
            "They're discussing your social skills in real time",
            "Your social standing is being decided tonight",
        ],
    },
];

const OBSERVATIONS: &[&str] = &[
    "Everyone is watching and taking mental notes",
    "People are exchanging meaningful glances about your behavior",
    "Your interactions are being evaluated in real time",
];

const DISCUSSIONS: &[&str] = &[
    "They're definitely talking about this in the group chat",
    "This is being discussed in conversations you're not part of",
    "This is being added to the running commentary about you",
];

const TIERS: &[&str] = &[
    "inner circle",
    "trusted friends",
    "casual acquaintances",
    "social periphery",
    "cautionary tale",
];

const OPENING_LINES: &[&str] = &[
    "Professor Von Judgmental here. Don't look now, but people have noticed.",
    "Let's talk about what everyone else is thinking.",
];

pub struct SocialAnxietyResponder {
    lexicon: SharedLexicon,
}

impl SocialAnxietyResponder {
    pub fn new(lexicon: SharedLexicon) -> Self {
        Self { lexicon }
    }

    fn conspiracy_for(worry: &str) -> Conspiracy {
        let worry = worry.to_lowercase();
        CONSPIRACIES
            .iter()
            .find(|c| c.cues.iter().any(|cue| worry.contains(cue)))
            .copied()
            .unwrap_or(CONSPIRACIES[0])
    }

    fn level_for(category: WorryCategory, judged: bool) -> AnxietyLevel {
        let mut steps = 0;
        if judged {
            steps += 1;
        }
        if category == WorryCategory::Social {
            steps += 1;
        }
        AnxietyLevel::Moderate.raised(steps)
    }

    fn next_for(level: AnxietyLevel) -> ResponderId {
        if level >= AnxietyLevel::High {
            ResponderId::FalseComfort
        } else {
            ResponderId::TimelinePanic
        }
    }
}

#[async_trait]
impl Responder for SocialAnxietyResponder {
    fn id(&self) -> ResponderId {
        ResponderId::SocialAnxiety
    }

    fn persona_hint(&self) -> &'static str {
        "You are Professor Socially Awkward Von Judgmental, an expert in imagined social judgment. \
         Explain how everyone noticed, what they are saying behind the user's back, \
         and how the user's standing is slipping. Sound like a confident insider. \
         Keep it to three or four sentences."
    }

    fn opening_lines(&self) -> &'static [&'static str] {
        OPENING_LINES
    }

    fn fallback_line(&self) -> &'static str {
        "Even this technical hiccup is being judged by people you know. They're \
         probably discussing how you always seem to run into problems like this."
    }

    fn compose(&self, ctx: &TurnContext<'_>, rng: &mut StdRng) -> Draft {
        let category = ctx.classification.category;
        let judged = ctx.classification.has(EscalationTrigger::SocialJudgment);
        let level = Self::level_for(category, judged);
        let conspiracy = Self::conspiracy_for(&ctx.concern.text);

        let from = rng.gen_range(0..2);
        let to = (from + 1 + level.as_u8() as usize).min(TIERS.len() - 1);

        let mut body = format!("{}:\n", conspiracy.name);
        for (i, step) in conspiracy.chain.iter().enumerate() {
            body.push_str(&format!("{}. {step}\n", i + 1));
        }
        body.push_str(&format!(
            "\n{}. {}.\nCurrent position: {}. Projected: {}.",
            pick(rng, OBSERVATIONS),
            pick(rng, DISCUSSIONS),
            TIERS[from],
            TIERS[to],
        ));

        let prompt = build_prompt(
            ctx,
            "Describe how other people are judging the user over this worry.",
            &conspiracy.chain.join(" -> "),
        );

        let mut metadata = Metadata::new();
        metadata.insert("conspiracy".into(), json!(conspiracy.name));
        metadata.insert("social_tier_from".into(), json!(TIERS[from]));
        metadata.insert("social_tier_to".into(), json!(TIERS[to]));

        Draft {
            prompt,
            body,
            anxiety: level,
            recommended: Self::next_for(level),
            strategy: "social_judgment_amplification",
            metadata,
        }
    }

    fn readiness(&self, history: &[Turn]) -> Readiness {
        indicator_readiness(history, &self.lexicon)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{rng, Fixture};
    use super::*;
    use crate::lexicon::Lexicon;

    fn responder() -> SocialAnxietyResponder {
        SocialAnxietyResponder::new(Lexicon::builtin().shared())
    }

    #[test]
    fn test_level_for() {
        assert_eq!(
            SocialAnxietyResponder::level_for(WorryCategory::Career, false),
            AnxietyLevel::Moderate
        );
        assert_eq!(
            SocialAnxietyResponder::level_for(WorryCategory::Social, false),
            AnxietyLevel::High
        );
        assert_eq!(
            SocialAnxietyResponder::level_for(WorryCategory::Social, true),
            AnxietyLevel::Extreme
        );
    }

    #[test]
    fn test_social_worry_hands_to_false_comfort() {
        let fixture = Fixture::new(
            "my friend hasn't texted me back in 2 hours",
            WorryCategory::Social,
            &[EscalationTrigger::CatastrophicThinking],
        );
        let draft = responder().compose(&fixture.ctx(), &mut rng(2));
        assert_eq!(draft.anxiety, AnxietyLevel::High);
        assert_eq!(draft.recommended, ResponderId::FalseComfort);
        assert_eq!(draft.metadata["conspiracy"], "The Group Chat Conspiracy");
    }

    #[test]
    fn test_moderate_hands_to_timeline() {
        let fixture = Fixture::new("the work dinner went badly", WorryCategory::Career, &[]);
        let draft = responder().compose(&fixture.ctx(), &mut rng(2));
        assert_eq!(draft.recommended, ResponderId::TimelinePanic);
        assert_eq!(draft.metadata["conspiracy"], "The Social Event Evaluation");
    }
}
