//! Keyword tables driving classification and readiness.
//!
//! A [`Lexicon`] is built once at startup (built-in tables, optionally
//! overlaid from a TOML file) and shared read-only as [`SharedLexicon`].
//! All keywords are stored lower-cased so matching only has to lower-case
//! the input text.
//!
//! Override file format:
//!
//! ```toml
//! [categories]
//! social = ["friend", "text", "group chat"]
//!
//! [triggers]
//! time_sensitive = ["urgent", "asap"]
//!
//! readiness_indicators = ["yes", "no", "because"]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::types::{EscalationTrigger, WorryCategory};

/// Shared reference to an immutable lexicon.
pub type SharedLexicon = Arc<Lexicon>;

/// Errors raised while loading a lexicon override.
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("failed to read lexicon file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse lexicon TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    UnknownKey(String),
}

/// Category, trigger, and readiness keyword tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexicon {
    categories: BTreeMap<WorryCategory, Vec<String>>,
    triggers: BTreeMap<EscalationTrigger, Vec<String>>,
    readiness_indicators: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LexiconOverride {
    #[serde(default)]
    categories: HashMap<String, Vec<String>>,
    #[serde(default)]
    triggers: HashMap<String, Vec<String>>,
    #[serde(default)]
    readiness_indicators: Option<Vec<String>>,
}

impl Lexicon {
    /// Built-in tables.
    pub fn builtin() -> Self {
        let categories = WorryCategory::SCORED
            .iter()
            .map(|&category| (category, normalize(builtin_category(category))))
            .collect();
        let triggers = EscalationTrigger::ALL
            .iter()
            .map(|&trigger| (trigger, normalize(builtin_trigger(trigger))))
            .collect();

        Self {
            categories,
            triggers,
            readiness_indicators: normalize(READINESS_INDICATORS),
        }
    }

    /// Built-in tables with the given TOML overlaid. Lists present in the
    /// overlay replace the built-in list for that key.
    pub fn from_toml_str(raw: &str) -> Result<Self, LexiconError> {
        let overlay: LexiconOverride = toml::from_str(raw)?;
        let mut lexicon = Self::builtin();

        for (name, words) in overlay.categories {
            let category: WorryCategory = name.parse().map_err(LexiconError::UnknownKey)?;
            if category == WorryCategory::General {
                return Err(LexiconError::UnknownKey(
                    "general has no keywords; it is the no-match fallback".to_string(),
                ));
            }
            lexicon.categories.insert(category, normalize(&words));
        }

        for (name, words) in overlay.triggers {
            let trigger: EscalationTrigger = name.parse().map_err(LexiconError::UnknownKey)?;
            lexicon.triggers.insert(trigger, normalize(&words));
        }

        if let Some(indicators) = overlay.readiness_indicators {
            lexicon.readiness_indicators = normalize(&indicators);
        }

        Ok(lexicon)
    }

    /// Load an override file on top of the built-in tables.
    pub fn load(path: &Path) -> Result<Self, LexiconError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn shared(self) -> SharedLexicon {
        Arc::new(self)
    }

    pub fn category_keywords(&self, category: WorryCategory) -> &[String] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn trigger_keywords(&self, trigger: EscalationTrigger) -> &[String] {
        self.triggers
            .get(&trigger)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn readiness_indicators(&self) -> &[String] {
        &self.readiness_indicators
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lower-case, trim, drop empties and duplicates. An empty keyword would
/// match every input.
fn normalize<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let word = word.as_ref().trim().to_lowercase();
        if !word.is_empty() && !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

const READINESS_INDICATORS: &[&str] = &[
    "yes",
    "no",
    "it's been",
    "since",
    "because",
    "when",
    "after",
    "before",
    "usually",
    "sometimes",
    "always",
    "never",
];

fn builtin_category(category: WorryCategory) -> &'static [&'static str] {
    match category {
        WorryCategory::Social => &[
            "friend",
            "friends",
            "text",
            "texting",
            "message",
            "call",
            "party",
            "invite",
            "social",
            "awkward",
            "embarrassed",
            "judge",
            "think of me",
            "relationship",
            "dating",
            "crush",
            "hangout",
            "group",
            "conversation",
        ],
        WorryCategory::Health => &[
            "sick",
            "pain",
            "hurt",
            "doctor",
            "symptom",
            "illness",
            "disease",
            "headache",
            "tired",
            "fatigue",
            "weird feeling",
            "body",
            "medical",
            "health",
            "hospital",
            "medication",
            "virus",
            "infection",
        ],
        WorryCategory::Career => &[
            "job",
            "work",
            "boss",
            "career",
            "interview",
            "promotion",
            "fired",
            "layoff",
            "performance",
            "deadline",
            "project",
            "meeting",
            "email",
            "colleague",
            "professional",
            "salary",
            "unemployment",
        ],
        WorryCategory::Finances => &[
            "money",
            "broke",
            "debt",
            "bill",
            "rent",
            "mortgage",
            "loan",
            "budget",
            "expensive",
            "afford",
            "financial",
            "savings",
            "bank",
            "credit",
            "payment",
            "income",
            "cost",
        ],
        WorryCategory::Relationships => &[
            "boyfriend",
            "girlfriend",
            "spouse",
            "partner",
            "family",
            "parents",
            "marriage",
            "divorce",
            "breakup",
            "fight",
            "argument",
            "love",
            "relationship",
            "dating",
            "commitment",
            "trust",
        ],
        WorryCategory::Technology => &[
            "computer",
            "phone",
            "internet",
            "wifi",
            "app",
            "software",
            "hack",
            "virus",
            "data",
            "privacy",
            "social media",
            "online",
            "digital",
            "technology",
            "device",
            "technical",
        ],
        WorryCategory::Existential => &[
            "life",
            "death",
            "meaning",
            "purpose",
            "future",
            "past",
            "regret",
            "mistake",
            "choice",
            "decision",
            "what if",
            "universe",
            "existence",
            "philosophy",
            "deep",
            "profound",
        ],
        WorryCategory::General => &[],
    }
}

fn builtin_trigger(trigger: EscalationTrigger) -> &'static [&'static str] {
    match trigger {
        EscalationTrigger::TimeSensitive => &[
            "urgent",
            "deadline",
            "soon",
            "today",
            "tomorrow",
            "this week",
            "running out of time",
            "late",
            "overdue",
            "immediate",
        ],
        EscalationTrigger::SocialJudgment => &[
            "everyone",
            "people think",
            "judge",
            "opinion",
            "reputation",
            "embarrassed",
            "ashamed",
            "look bad",
            "impression",
        ],
        EscalationTrigger::HealthAnxiety => &[
            "serious",
            "dangerous",
            "wrong",
            "bad",
            "fatal",
            "chronic",
            "progressive",
            "spreading",
            "getting worse",
        ],
        EscalationTrigger::CatastrophicThinking => &[
            "disaster",
            "ruin",
            "destroy",
            "end",
            "terrible",
            "awful",
            "horrible",
            "nightmare",
            "catastrophe",
            "worst case",
        ],
        EscalationTrigger::Uncertainty => &[
            "don't know",
            "unsure",
            "confused",
            "unclear",
            "ambiguous",
            "maybe",
            "what if",
            "could be",
            "might be",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_scored_category_and_trigger() {
        let lexicon = Lexicon::builtin();
        for category in WorryCategory::SCORED {
            assert!(!lexicon.category_keywords(category).is_empty(), "{category}");
        }
        for trigger in EscalationTrigger::ALL {
            assert!(!lexicon.trigger_keywords(trigger).is_empty(), "{trigger}");
        }
        assert!(lexicon.category_keywords(WorryCategory::General).is_empty());
    }

    #[test]
    fn test_override_replaces_only_named_lists() {
        let lexicon = Lexicon::from_toml_str(
            r#"
            readiness_indicators = ["Indeed", "  "]

            [categories]
            social = ["Group Chat", "group chat", ""]

            [triggers]
            uncertainty = ["Perhaps"]
            "#,
        )
        .unwrap();

        assert_eq!(lexicon.category_keywords(WorryCategory::Social), ["group chat"]);
        assert_eq!(
            lexicon.trigger_keywords(EscalationTrigger::Uncertainty),
            ["perhaps"]
        );
        assert_eq!(lexicon.readiness_indicators(), ["indeed"]);
        assert_eq!(
            lexicon.category_keywords(WorryCategory::Health),
            Lexicon::builtin().category_keywords(WorryCategory::Health)
        );
    }

    #[test]
    fn test_override_rejects_unknown_keys() {
        let err = Lexicon::from_toml_str("[categories]\nweather = [\"rain\"]").unwrap_err();
        assert!(matches!(err, LexiconError::UnknownKey(_)));

        let err = Lexicon::from_toml_str("[categories]\ngeneral = [\"thing\"]").unwrap_err();
        assert!(matches!(err, LexiconError::UnknownKey(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.toml");
        std::fs::write(&path, "[triggers]\ntime_sensitive = [\"asap\"]\n").unwrap();

        let lexicon = Lexicon::load(&path).unwrap();
        assert_eq!(
            lexicon.trigger_keywords(EscalationTrigger::TimeSensitive),
            ["asap"]
        );
    }
}
