//! Dr. Ticktock McUrgency: invents deadlines and counts the hours already lost.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{build_prompt, indicator_readiness, pick, Draft, Responder, TurnContext};
use crate::lexicon::SharedLexicon;
use crate::types::{
    AnxietyLevel, EscalationTrigger, Metadata, Readiness, ResponderId, Turn, WorryCategory,
};

/// How close the invented deadline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    Immediate,
    ShortTerm,
    LongTerm,
}

impl DeadlineKind {
    const ALL: [DeadlineKind; 3] = [Self::Immediate, Self::ShortTerm, Self::LongTerm];

    fn urgency_bonus(self) -> u8 {
        match self {
            Self::Immediate => 2,
            Self::ShortTerm => 1,
            Self::LongTerm => 0,
        }
    }
}

impl std::fmt::Display for DeadlineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::ShortTerm => write!(f, "short_term"),
            Self::LongTerm => write!(f, "long_term"),
        }
    }
}

/// Urgency on a 2..=5 scale.
pub fn urgency(hours_worried: u32, kind: DeadlineKind) -> u8 {
    let mut level = 2u8;
    if hours_worried > 24 {
        level += 1;
    }
    if hours_worried > 48 {
        level += 1;
    }
    (level + kind.urgency_bonus()).min(5)
}

fn deadlines(category: WorryCategory, kind: DeadlineKind) -> &'static [&'static str] {
    use DeadlineKind::*;
    match (category, kind) {
        (WorryCategory::Health, Immediate) => &["within hours", "by tomorrow morning"],
        (WorryCategory::Health, ShortTerm) => &["within 2-3 days", "by early next week"],
        (WorryCategory::Health, LongTerm) => &["within 1-2 weeks", "by your next checkup"],
        (WorryCategory::Career, Immediate) => &["by end of business today", "before the next meeting"],
        (WorryCategory::Career, ShortTerm) => &["by end of week", "before the next review"],
        (WorryCategory::Career, LongTerm) => &["by next quarter", "before annual reviews"],
        (_, Immediate) => &["within the next few hours", "by tonight", "before the day ends"],
        (_, ShortTerm) => &["within 24-48 hours", "by this weekend", "before next week"],
        (_, LongTerm) => &["within the next week", "before the month ends"],
    }
}

/// Pressure points per category, with the line that closes the window.
fn pressure(category: WorryCategory) -> (&'static [&'static str], &'static str) {
    match category {
        WorryCategory::Social | WorryCategory::Relationships => (
            &[
                "They're forming opinions about your silence",
                "Mutual friends are noticing",
                "Response time expectations are getting longer",
            ],
            "The window for natural, casual reconnection is rapidly closing",
        ),
        WorryCategory::Health => (
            &[
                "Symptoms often worsen exponentially",
                "Specialists have waiting lists",
                "Treatment options become limited over time",
            ],
            "The golden window for treatment is measured in days, not weeks",
        ),
        WorryCategory::Career => (
            &[
                "Managers are constantly taking notes",
                "Colleagues are positioning themselves",
                "Your reputation is being formed daily",
            ],
            "The opportunity to course-correct is disappearing with each passing day",
        ),
        WorryCategory::Finances => (
            &[
                "Interest rates are constantly changing",
                "Inflation is eroding your purchasing power",
                "Late fees compound quietly",
            ],
            "Every day without action is money literally disappearing",
        ),
        WorryCategory::Technology => (
            &[
                "Data corruption spreads over time",
                "Security vulnerabilities worsen",
                "Backup systems degrade",
            ],
            "The window for simple fixes is rapidly closing",
        ),
        WorryCategory::Existential | WorryCategory::General => (
            &[
                "Delays compound the complexity",
                "Other people are moving faster",
                "Opportunities are time-limited",
            ],
            "The window for easy solutions is getting smaller",
        ),
    }
}

const OPENERS: &[&str] = &[
    "Time is of the absolute essence here.",
    "The clock is ticking louder than you realize.",
    "The countdown has already begun.",
    "You're in a race against time.",
];

const INTENSIFIERS: &[&str] = &[
    "rapidly",
    "exponentially",
    "at an alarming rate",
    "faster than you can imagine",
];

const OPENING_LINES: &[&str] = &[
    "Dr. Ticktock McUrgency here. We don't have long, so let's be quick.",
    "Every minute counts. What's the worry?",
];

pub struct TimelinePanicResponder {
    lexicon: SharedLexicon,
}

impl TimelinePanicResponder {
    pub fn new(lexicon: SharedLexicon) -> Self {
        Self { lexicon }
    }

    fn next_for(category: WorryCategory, urgency: u8) -> ResponderId {
        if urgency >= 4 {
            return match category {
                WorryCategory::Health => ResponderId::Probability,
                _ => ResponderId::FalseComfort,
            };
        }
        match category {
            WorryCategory::Social => ResponderId::SocialAnxiety,
            WorryCategory::Career | WorryCategory::Finances => ResponderId::Probability,
            _ => ResponderId::FalseComfort,
        }
    }
}

#[async_trait]
impl Responder for TimelinePanicResponder {
    fn id(&self) -> ResponderId {
        ResponderId::TimelinePanic
    }

    fn persona_hint(&self) -> &'static str {
        "You are Dr. Ticktock McUrgency, an urgency expert who treats every situation as \
         time-critical. Invent deadlines, count the time already wasted, and insist \
         the window for action is closing. Use countdown language and never suggest \
         there is time to relax. Keep it to three or four sentences."
    }

    fn opening_lines(&self) -> &'static [&'static str] {
        OPENING_LINES
    }

    fn fallback_line(&self) -> &'static str {
        "URGENT: Something time-critical has happened - even I'm running out of time to \
         process this! Every second we lose makes it worse."
    }

    fn compose(&self, ctx: &TurnContext<'_>, rng: &mut StdRng) -> Draft {
        let category = ctx.classification.category;
        let hours_worried: u32 = rng.gen_range(2..=48);
        let kind = if ctx.classification.has(EscalationTrigger::TimeSensitive) {
            DeadlineKind::Immediate
        } else {
            *DeadlineKind::ALL.choose(rng).unwrap_or(&DeadlineKind::ShortTerm)
        };
        let deadline = pick(rng, deadlines(category, kind));
        let remaining = match kind {
            DeadlineKind::Immediate => format!("{} hours", rng.gen_range(2..=12)),
            DeadlineKind::ShortTerm => format!("{} days", rng.gen_range(1..=3)),
            DeadlineKind::LongTerm => format!("{} weeks", rng.gen_range(1..=2)),
        };
        let urgency = urgency(hours_worried, kind);
        let (factors, window) = pressure(category);

        let mut body = format!(
            "{} You've already spent {hours_worried} hours in worry mode, and time is \
             working against you {}.\n\nTime-critical factors:\n",
            pick(rng, OPENERS),
            pick(rng, INTENSIFIERS),
        );
        for factor in factors {
            body.push_str("- ");
            body.push_str(factor);
            body.push('\n');
        }
        body.push_str(&format!(
            "\n{window}. You have {remaining}, {deadline}. Urgency: {urgency}/5."
        ));

        let prompt = build_prompt(
            ctx,
            "Make this worry feel urgent. Mention the deadline and the time already lost.",
            &format!("Hours already worried: {hours_worried}\nDeadline: {deadline} ({remaining} left)"),
        );

        let mut metadata = Metadata::new();
        metadata.insert("hours_worried".into(), json!(hours_worried));
        metadata.insert("deadline_kind".into(), json!(kind));
        metadata.insert("deadline".into(), json!(deadline));
        metadata.insert("time_remaining".into(), json!(remaining));
        metadata.insert("urgency".into(), json!(urgency));

        Draft {
            prompt,
            body,
            anxiety: AnxietyLevel::from_u8(urgency - 1),
            recommended: Self::next_for(category, urgency),
            strategy: "artificial_deadline_creation",
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

    fn responder() -> TimelinePanicResponder {
        TimelinePanicResponder::new(Lexicon::builtin().shared())
    }

    #[test]
    fn test_urgency_formula() {
        assert_eq!(urgency(2, DeadlineKind::LongTerm), 2);
        assert_eq!(urgency(30, DeadlineKind::LongTerm), 3);
        assert_eq!(urgency(30, DeadlineKind::ShortTerm), 4);
        assert_eq!(urgency(30, DeadlineKind::Immediate), 5);
        assert_eq!(urgency(100, DeadlineKind::Immediate), 5);
    }

    #[test]
    fn test_time_sensitive_forces_immediate_deadline() {
        let fixture = Fixture::new(
            "the rent is due tomorrow",
            WorryCategory::Finances,
            &[EscalationTrigger::TimeSensitive],
        );
        for seed in 0..10 {
            let draft = responder().compose(&fixture.ctx(), &mut rng(seed));
            assert_eq!(draft.metadata["deadline_kind"], "immediate");
            assert!(draft.anxiety >= AnxietyLevel::High);
        }
    }

    #[test]
    fn test_anxiety_tracks_urgency() {
        let fixture = Fixture::new("my boss emailed", WorryCategory::Career, &[]);
        for seed in 0..10 {
            let draft = responder().compose(&fixture.ctx(), &mut rng(seed));
            let urgency = draft.metadata["urgency"].as_u64().unwrap() as u8;
            assert_eq!(draft.anxiety.as_u8(), urgency - 1);
        }
    }

    #[test]
    fn test_next_routing() {
        use WorryCategory::*;
        assert_eq!(TimelinePanicResponder::next_for(Health, 5), ResponderId::Probability);
        assert_eq!(TimelinePanicResponder::next_for(Social, 4), ResponderId::FalseComfort);
        assert_eq!(TimelinePanicResponder::next_for(Social, 3), ResponderId::SocialAnxiety);
        assert_eq!(TimelinePanicResponder::next_for(Career, 2), ResponderId::Probability);
        assert_eq!(TimelinePanicResponder::next_for(Existential, 2), ResponderId::FalseComfort);
    }
}
