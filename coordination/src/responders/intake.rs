//! Dr. Intake McTherapy: validates the worry, asks a question or two, and
//! decides who takes it from here. Never raises anxiety.

use async_trait::async_trait;
use rand::rngs::StdRng;
use serde_json::json;

use super::{build_prompt, indicator_readiness, Draft, Responder, TurnContext};
use crate::escalation::roster;
use crate::lexicon::SharedLexicon;
use crate::types::{
    Classification, EscalationTrigger, Metadata, Readiness, ResponderId, Turn, WorryCategory,
};

const MAX_QUESTIONS: usize = 2;

fn category_questions(category: WorryCategory) -> &'static [&'static str] {
    match category {
        WorryCategory::Social => &[
            "How long has it been since you last heard from them?",
            "What was the last interaction you had with them like?",
            "Have you noticed any changes in their communication lately?",
        ],
        WorryCategory::Health => &[
            "How long have you been experiencing this?",
            "Have you noticed if anything makes it better or worse?",
            "Are there any other symptoms you've been experiencing?",
        ],
        WorryCategory::Career => &[
            "What's the timeline you're working with here?",
            "How have similar situations been handled in the past?",
            "Who else is involved in this?",
        ],
        WorryCategory::Finances => &[
            "What's your timeline for resolving this?",
            "Are there other financial obligations this might affect?",
            "What happens if this gets worse?",
        ],
        _ => &[
            "What's the worst-case scenario you're imagining?",
            "How might this affect other areas of your life?",
            "Are there aspects of this situation you haven't considered?",
        ],
    }
}

fn trigger_question(trigger: EscalationTrigger) -> Option<&'static str> {
    match trigger {
        EscalationTrigger::TimeSensitive => Some("What happens if you don't resolve this in time?"),
        EscalationTrigger::SocialJudgment => {
            Some("How do you think others would react if they knew about this?")
        }
        EscalationTrigger::Uncertainty => Some("What are all the possible outcomes you can think of?"),
        _ => None,
    }
}

/// Up to two questions: trigger-specific first, then the category's own.
pub fn clarifying_questions(classification: &Classification) -> Vec<&'static str> {
    classification
        .triggers
        .iter()
        .filter_map(|t| trigger_question(*t))
        .chain(category_questions(classification.category).iter().copied())
        .take(MAX_QUESTIONS)
        .collect()
}

/// First escalation responder for a fresh worry.
pub fn first_escalation(classification: &Classification) -> ResponderId {
    use EscalationTrigger::*;
    let category = classification.category;
    if classification.has(Uncertainty) {
        ResponderId::TimelinePanic
    } else if category == WorryCategory::Health {
        ResponderId::Catastrophe
    } else if classification.has(SocialJudgment) {
        ResponderId::SocialAnxiety
    } else if classification.has(CatastrophicThinking)
        && matches!(category, WorryCategory::Finances | WorryCategory::General)
    {
        ResponderId::Catastrophe
    } else {
        roster(category)
            .first()
            .copied()
            .unwrap_or(ResponderId::Catastrophe)
    }
}

const OPENING_LINES: &[&str] = &[
    "Hello! I'm Dr. Intake McTherapy. I'm here to listen and help you work through whatever is on your mind. What's been concerning you lately?",
    "Welcome! This is a safe space to explore your worries. What would you like to talk about today?",
    "Hi there! I help people understand and work through their concerns. What's been weighing on your mind?",
];

pub struct IntakeResponder {
    lexicon: SharedLexicon,
}

impl IntakeResponder {
    pub fn new(lexicon: SharedLexicon) -> Self {
        Self { lexicon }
    }
}

#[async_trait]
impl Responder for IntakeResponder {
    fn id(&self) -> ResponderId {
        ResponderId::Intake
    }

    fn persona_hint(&self) -> &'static str {
        "You are Dr. Intake McTherapy, a warm and validating listener. Acknowledge the \
         user's worry with empathy and build trust. Do not escalate or add new fears. \
         Reply in one or two short sentences."
    }

    fn opening_lines(&self) -> &'static [&'static str] {
        OPENING_LINES
    }

    fn fallback_line(&self) -> &'static str {
        "I understand how you feel about this. That sounds really challenging. Let's \
         explore this together."
    }

    fn compose(&self, ctx: &TurnContext<'_>, _rng: &mut StdRng) -> Draft {
        let questions = clarifying_questions(ctx.classification);
        let body = questions.join(" ");
        let recommended = first_escalation(ctx.classification);

        let prompt = build_prompt(
            ctx,
            "Validate the user's feelings in one or two sentences. Do not ask questions.",
            "",
        );

        let mut metadata = Metadata::new();
        metadata.insert("clarifying_questions".into(), json!(questions));

        Draft {
            prompt,
            body,
            anxiety: ctx.anxiety,
            recommended,
            strategy: if ctx.classification.triggers.is_empty() {
                "trust_building"
            } else {
                "concern_validation"
            },
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
    use crate::types::AnxietyLevel;
    use std::collections::BTreeSet;

    fn classification(category: WorryCategory, triggers: &[EscalationTrigger]) -> Classification {
        Classification {
            category,
            triggers: triggers.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_first_escalation_rules() {
        use EscalationTrigger::*;
        assert_eq!(
            first_escalation(&classification(WorryCategory::Health, &[Uncertainty])),
            ResponderId::TimelinePanic
        );
        assert_eq!(
            first_escalation(&classification(WorryCategory::Health, &[])),
            ResponderId::Catastrophe
        );
        assert_eq!(
            first_escalation(&classification(WorryCategory::Career, &[SocialJudgment])),
            ResponderId::SocialAnxiety
        );
        assert_eq!(
            first_escalation(&classification(WorryCategory::Finances, &[CatastrophicThinking])),
            ResponderId::Catastrophe
        );
        assert_eq!(
            first_escalation(&classification(WorryCategory::Social, &[CatastrophicThinking])),
            ResponderId::SocialAnxiety
        );
        assert_eq!(
            first_escalation(&classification(WorryCategory::Career, &[])),
            ResponderId::TimelinePanic
        );
    }

    #[test]
    fn test_never_recommends_itself() {
        for category in WorryCategory::SCORED {
            for trigger in EscalationTrigger::ALL {
                let c = classification(category, &[trigger]);
                assert_ne!(first_escalation(&c), ResponderId::Intake);
            }
        }
        assert_ne!(first_escalation(&Classification::general()), ResponderId::Intake);
    }

    #[test]
    fn test_at_most_two_questions_trigger_first() {
        let c = classification(
            WorryCategory::Career,
            &[EscalationTrigger::TimeSensitive, EscalationTrigger::Uncertainty],
        );
        let questions = clarifying_questions(&c);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0], "What happens if you don't resolve this in time?");
    }

    #[test]
    fn test_compose_keeps_anxiety() {
        let responder = IntakeResponder::new(Lexicon::builtin().shared());
        let fixture = Fixture::new(
            "my friend hasn't texted me back in 2 hours",
            WorryCategory::Social,
            &[EscalationTrigger::CatastrophicThinking],
        )
        .with_anxiety(AnxietyLevel::Mild);
        let draft = responder.compose(&fixture.ctx(), &mut rng(0));
        assert_eq!(draft.anxiety, AnxietyLevel::Mild);
        assert_eq!(draft.recommended, ResponderId::SocialAnxiety);
        assert_eq!(draft.strategy, "concern_validation");
    }
}
