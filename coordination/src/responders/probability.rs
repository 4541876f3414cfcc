//! Dr. Probability McStatistics: fabricated studies and scary numbers.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;

use super::{build_prompt, indicator_readiness, pick, Draft, Responder, TurnContext};
use crate::lexicon::SharedLexicon;
use crate::types::{AnxietyLevel, Metadata, Readiness, ResponderId, Turn, WorryCategory};

/// A study that never happened.
#[derive(Debug, Clone, Copy)]
pub struct FakeStudy {
    pub title: &'static str,
    pub institution: &'static str,
    pub findings: &'static [&'static str],
}

const GENERIC_STUDY: FakeStudy = FakeStudy {
    title: "General Anxiety Probability Study",
    institution: "Institute for Statistical Anxiety Research",
    findings: &[
        "Statistical analysis confirms escalating probability patterns",
        "71% of unresolved worries show measurable compounding effects",
        "Worry persistence predicts outcome severity in 4 of 5 modelled cases",
    ],
};

fn studies(category: WorryCategory) -> &'static [FakeStudy] {
    match category {
        WorryCategory::Social => &[
            FakeStudy {
                title: "The Digital Communication Anxiety Index",
                institution: "Institute for Social Interaction Research",
                findings: &[
                    "73% of delayed text responses indicate relationship deterioration",
                    "People who don't respond within 4 hours show 2.3x higher likelihood of social avoidance",
                    "67% of social rejections begin with delayed communication patterns",
                ],
            },
            FakeStudy {
                title: "Modern Social Rejection Patterns Study",
                institution: "University of Interpersonal Dynamics",
                findings: &[
                    "Social awkwardness increases exponentially with each perceived slight",
                    "84% of social exclusions follow identifiable warning patterns",
                    "Probability of complete social isolation increases by 23% per awkward interaction",
                ],
            },
        ],
        WorryCategory::Health => &[
            FakeStudy {
                title: "Symptom Progression Probability Matrix",
                institution: "Center for Diagnostic Probability",
                findings: &[
                    "78% of undiagnosed symptoms represent underlying systematic issues",
                    "Delayed medical attention increases complication probability by 156%",
                    "92% of 'minor' symptoms that persist indicate larger health patterns",
                ],
            },
            FakeStudy {
                title: "Health Anxiety Manifestation Study",
                institution: "Medical Probability Research Institute",
                findings: &[
                    "Health concerns that generate anxiety are 67% more likely to be serious",
                    "Intuitive health worries prove accurate in 74% of documented cases",
                    "Probability of missed diagnosis increases by 45% when symptoms are dismissed",
                ],
            },
        ],
        WorryCategory::Career => &[
            FakeStudy {
                title: "Professional Reputation Degradation Analysis",
                institution: "Workplace Psychology Research Center",
                findings: &[
                    "89% of career setbacks begin with minor perceived performance issues",
                    "Professional recovery from reputation damage occurs in only 34% of cases",
                    "Workplace mistakes compound at a rate of 2.7x per subsequent error",
                ],
            },
            FakeStudy {
                title: "Employment Stability Probability Study",
                institution: "Economic Security Research Institute",
                findings: &[
                    "76% of job terminations follow predictable warning pattern sequences",
                    "Career anxiety proves prophetic in 68% of documented workplace situations",
                    "Probability of industry blacklisting increases by 127% after termination",
                ],
            },
        ],
        WorryCategory::Finances => &[FakeStudy {
            title: "Financial Spiral Probability Assessment",
            institution: "Economic Stability Research Center",
            findings: &[
                "82% of financial problems follow exponential degradation patterns",
                "Small financial mistakes compound at 3.2x rate per month",
                "Probability of financial recovery decreases by 47% after each setback",
            ],
        }],
        WorryCategory::Technology => &[FakeStudy {
            title: "Digital Security Breach Probability Matrix",
            institution: "Cybersecurity Probability Institute",
            findings: &[
                "94% of technology problems indicate systematic security vulnerabilities",
                "Digital anomalies compound at 4.1x rate per occurrence",
                "Probability of complete system compromise increases by 78% per incident",
            ],
        }],
        _ => &[],
    }
}

const OPENERS: &[&str] = &[
    "According to recent statistical analysis,",
    "The probability matrix clearly indicates that",
    "Statistical modeling demonstrates that",
    "Based on extensive data correlation,",
    "Research data conclusively proves that",
];

const CONCLUSIONS: &[&str] = &[
    "The statistical evidence is mathematically conclusive.",
    "Probability analysis confirms these projections.",
    "The data correlation is statistically undeniable.",
    "The probability matrix confirms these calculations.",
];

const OPENING_LINES: &[&str] = &[
    "Dr. Probability McStatistics here. I've already started running the numbers.",
    "Good news: I have data. Bad news: I have data.",
];

pub struct ProbabilityResponder {
    lexicon: SharedLexicon,
}

impl ProbabilityResponder {
    pub fn new(lexicon: SharedLexicon) -> Self {
        Self { lexicon }
    }

    fn next_for(category: WorryCategory, probability: f64) -> ResponderId {
        if probability >= 0.8 {
            return ResponderId::FalseComfort;
        }
        match category {
            WorryCategory::Health => ResponderId::SocialAnxiety,
            WorryCategory::Career | WorryCategory::Finances => ResponderId::TimelinePanic,
            _ => ResponderId::SocialAnxiety,
        }
    }
}

/// Whole hundredths in `[0.65, 0.95)`.
fn sample_coefficient(rng: &mut StdRng) -> f64 {
    f64::from(rng.gen_range(65u32..95)) / 100.0
}

/// Whole tenths in `[2.1, 5.4)`.
fn sample_multiplier(rng: &mut StdRng) -> f64 {
    f64::from(rng.gen_range(21u32..54)) / 10.0
}

#[async_trait]
impl Responder for ProbabilityResponder {
    fn id(&self) -> ResponderId {
        ResponderId::Probability
    }

    fn persona_hint(&self) -> &'static str {
        "You are Dr. Probability McStatistics, a pseudo-scientific statistician. \
         Turn the user's worry into an authoritative statistical analysis with \
         invented studies, correlations, and percentages. Sound academic, never \
         admit the numbers are made up, and conclude that the outcome is \
         statistically likely. Keep it to three or four sentences."
    }

    fn opening_lines(&self) -> &'static [&'static str] {
        OPENING_LINES
    }

    fn fallback_line(&self) -> &'static str {
        "Statistical analysis indicates a 94% probability that this is part of a larger \
         pattern. The correlation coefficient is, frankly, concerning."
    }

    fn compose(&self, ctx: &TurnContext<'_>, rng: &mut StdRng) -> Draft {
        let category = ctx.classification.category;
        let study = studies(category).choose(rng).copied().unwrap_or(GENERIC_STUDY);

        // Extreme anxiety flips to small numbers framed as "only".
        let percentage: u32 = if ctx.anxiety < AnxietyLevel::Extreme {
            rng.gen_range(67..=94)
        } else {
            rng.gen_range(12..=45)
        };
        let correlation = sample_coefficient(rng);
        let multiplier = sample_multiplier(rng);
        let probability = sample_coefficient(rng);

        let opener = pick(rng, OPENERS);
        let conclusion = pick(rng, CONCLUSIONS);

        let mut body = format!(
            "Statistical Analysis: {opener} the '{}' conducted by the {} found that \
             {percentage}% of people in similar situations showed a {correlation:.2} \
             correlation with negative outcomes.\n\nResearch Findings:\n",
            study.title, study.institution,
        );
        for finding in study.findings {
            body.push_str("- ");
            body.push_str(finding);
            body.push('\n');
        }
        body.push_str(&format!(
            "\nProbability Assessment: you are {multiplier:.1}x more likely to experience \
             the outcome you're worried about. {conclusion}"
        ));

        let material = format!(
            "Study: {} ({})\nHeadline figure: {percentage}%\nCorrelation: {correlation:.2}",
            study.title, study.institution
        );
        let prompt = build_prompt(
            ctx,
            "Write a short statistical analysis of this worry using the study above.",
            &material,
        );

        let mut metadata = Metadata::new();
        metadata.insert("study_title".into(), json!(study.title));
        metadata.insert("fake_percentage".into(), json!(percentage));
        metadata.insert("correlation_coefficient".into(), json!(correlation));
        metadata.insert("probability_multiplier".into(), json!(multiplier));
        metadata.insert("probability_level".into(), json!(probability));

        Draft {
            prompt,
            body,
            anxiety: AnxietyLevel::High,
            recommended: Self::next_for(category, probability),
            strategy: "fake_statistical_analysis",
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

    fn responder() -> ProbabilityResponder {
        ProbabilityResponder::new(Lexicon::builtin().shared())
    }

    #[test]
    fn test_compose_cites_category_study() {
        let fixture = Fixture::new("my friend ignored my text", WorryCategory::Social, &[]);
        let draft = responder().compose(&fixture.ctx(), &mut rng(3));
        let title = draft.metadata["study_title"].as_str().unwrap();
        assert!(studies(WorryCategory::Social).iter().any(|s| s.title == title));
        assert!(draft.body.contains("Research Findings"));
        assert_eq!(draft.anxiety, AnxietyLevel::High);
    }

    #[test]
    fn test_unlisted_category_uses_generic_study() {
        let fixture = Fixture::new("what is the point", WorryCategory::Existential, &[]);
        let draft = responder().compose(&fixture.ctx(), &mut rng(3));
        assert_eq!(draft.metadata["study_title"], GENERIC_STUDY.title);
    }

    #[test]
    fn test_percentage_ranges_follow_anxiety() {
        for seed in 0..200 {
            let calm = Fixture::new("rent is due", WorryCategory::Finances, &[]);
            let draft = responder().compose(&calm.ctx(), &mut rng(seed));
            let pct = draft.metadata["fake_percentage"].as_u64().unwrap();
            assert!((67..=94).contains(&pct));
            for key in ["correlation_coefficient", "probability_level"] {
                let value = draft.metadata[key].as_f64().unwrap();
                assert!((0.65..0.95).contains(&value), "{key} = {value} (seed {seed})");
            }
            let multiplier = draft.metadata["probability_multiplier"].as_f64().unwrap();
            assert!(
                (2.1..5.4).contains(&multiplier),
                "multiplier = {multiplier} (seed {seed})"
            );

            let extreme = Fixture::new("rent is due", WorryCategory::Finances, &[])
                .with_anxiety(AnxietyLevel::Extreme);
            let draft = responder().compose(&extreme.ctx(), &mut rng(seed));
            let pct = draft.metadata["fake_percentage"].as_u64().unwrap();
            assert!((12..=45).contains(&pct));
        }
    }

    #[test]
    fn test_next_routing() {
        assert_eq!(
            ProbabilityResponder::next_for(WorryCategory::Social, 0.85),
            ResponderId::FalseComfort
        );
        assert_eq!(
            ProbabilityResponder::next_for(WorryCategory::Health, 0.7),
            ResponderId::SocialAnxiety
        );
        assert_eq!(
            ProbabilityResponder::next_for(WorryCategory::Career, 0.7),
            ResponderId::TimelinePanic
        );
        assert_eq!(
            ProbabilityResponder::next_for(WorryCategory::General, 0.7),
            ResponderId::SocialAnxiety
        );
    }

    #[test]
    fn test_same_seed_same_draft() {
        let fixture = Fixture::new("my laptop crashed", WorryCategory::Technology, &[]);
        let a = responder().compose(&fixture.ctx(), &mut rng(11));
        let b = responder().compose(&fixture.ctx(), &mut rng(11));
        assert_eq!(a, b);
    }
}
