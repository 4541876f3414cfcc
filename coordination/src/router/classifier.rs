//! Concern classifier: keyword scoring of free text against the lexicon.
//!
//! Runs at the top of every turn that carries user text. Pure: the result
//! depends only on the text, the optional prior category, and the lexicon.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lexicon::SharedLexicon;
use crate::types::{Classification, EscalationTrigger, WorryCategory};

/// Per-category keyword hit count, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: WorryCategory,
    pub hits: usize,
}

/// Full scoring result including the per-category breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classification: Classification,
    /// Non-zero scores in tie-break priority order.
    pub scores: Vec<CategoryScore>,
    /// True when nothing matched and the prior category was reused.
    pub used_prior: bool,
}

impl ClassificationReport {
    /// Compact summary for logging.
    pub fn summary(&self) -> String {
        let scores: Vec<String> = self
            .scores
            .iter()
            .map(|s| format!("{}={}", s.category, s.hits))
            .collect();
        let triggers: Vec<String> = self
            .classification
            .triggers
            .iter()
            .map(ToString::to_string)
            .collect();
        format!(
            "category={} scores=[{}] triggers=[{}]{}",
            self.classification.category,
            scores.join(","),
            triggers.join(","),
            if self.used_prior { " (prior)" } else { "" }
        )
    }
}

/// Scores text against the shared lexicon.
#[derive(Debug, Clone)]
pub struct ConcernClassifier {
    lexicon: SharedLexicon,
}

impl ConcernClassifier {
    pub fn new(lexicon: SharedLexicon) -> Self {
        Self { lexicon }
    }

    /// Classify `text`. With no keyword hits the prior category is reused
    /// when supplied, otherwise the result is [`WorryCategory::General`].
    pub fn classify(&self, text: &str, prior: Option<WorryCategory>) -> Classification {
        self.analyze(text, prior).classification
    }

    /// Classify and keep the per-category breakdown.
    pub fn analyze(&self, text: &str, prior: Option<WorryCategory>) -> ClassificationReport {
        let lowered = text.to_lowercase();

        let scores: Vec<CategoryScore> = WorryCategory::SCORED
            .iter()
            .map(|&category| CategoryScore {
                category,
                hits: self
                    .lexicon
                    .category_keywords(category)
                    .iter()
                    .filter(|kw| lowered.contains(kw.as_str()))
                    .count(),
            })
            .filter(|s| s.hits > 0)
            .collect();

        // SCORED is in priority order, so the first maximum wins ties.
        let best = scores.iter().fold(None::<&CategoryScore>, |best, s| match best {
            Some(b) if b.hits >= s.hits => Some(b),
            _ => Some(s),
        });

        let (category, used_prior) = match (best, prior) {
            (Some(s), _) => (s.category, false),
            (None, Some(prior)) => (prior, true),
            (None, None) => (WorryCategory::General, false),
        };

        let triggers = EscalationTrigger::ALL
            .iter()
            .copied()
            .filter(|&t| {
                self.lexicon
                    .trigger_keywords(t)
                    .iter()
                    .any(|kw| lowered.contains(kw.as_str()))
            })
            .collect();

        let report = ClassificationReport {
            classification: Classification { category, triggers },
            scores,
            used_prior,
        };
        debug!(summary = %report.summary(), "Classified concern");
        report
    }
}
