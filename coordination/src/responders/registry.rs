//! Enum-keyed responder registry. Every [`ResponderId`] resolves, so lookup
//! cannot fail.

use std::sync::Arc;

use super::{
    CatastropheResponder, FalseComfortResponder, IntakeResponder, ProbabilityResponder,
    Responder, SocialAnxietyResponder, TimelinePanicResponder,
};
use crate::lexicon::SharedLexicon;
use crate::types::ResponderId;

/// Shared reference to the registry.
pub type SharedRegistry = Arc<ResponderRegistry>;

pub struct ResponderRegistry {
    intake: IntakeResponder,
    probability: ProbabilityResponder,
    catastrophe: CatastropheResponder,
    timeline: TimelinePanicResponder,
    social: SocialAnxietyResponder,
    comfort: FalseComfortResponder,
}

impl ResponderRegistry {
    /// The six built-in personas sharing one lexicon.
    pub fn builtin(lexicon: SharedLexicon) -> Self {
        Self {
            intake: IntakeResponder::new(Arc::clone(&lexicon)),
            probability: ProbabilityResponder::new(Arc::clone(&lexicon)),
            catastrophe: CatastropheResponder::new(Arc::clone(&lexicon)),
            timeline: TimelinePanicResponder::new(Arc::clone(&lexicon)),
            social: SocialAnxietyResponder::new(Arc::clone(&lexicon)),
            comfort: FalseComfortResponder::new(lexicon),
        }
    }

    pub fn get(&self, id: ResponderId) -> &dyn Responder {
        match id {
            ResponderId::Intake => &self.intake,
            ResponderId::Probability => &self.probability,
            ResponderId::Catastrophe => &self.catastrophe,
            ResponderId::TimelinePanic => &self.timeline,
            ResponderId::SocialAnxiety => &self.social,
            ResponderId::FalseComfort => &self.comfort,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Responder> + '_ {
        ResponderId::ALL.into_iter().map(move |id| self.get(id))
    }
}

impl std::fmt::Debug for ResponderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(ResponderId::ALL.iter().map(|id| id.to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    #[test]
    fn test_every_id_resolves_to_itself() {
        let registry = ResponderRegistry::builtin(Lexicon::builtin().shared());
        for id in ResponderId::ALL {
            assert_eq!(registry.get(id).id(), id);
        }
    }

    #[test]
    fn test_every_persona_has_opening_lines_and_fallback() {
        let registry = ResponderRegistry::builtin(Lexicon::builtin().shared());
        for responder in registry.iter() {
            assert!(!responder.opening_lines().is_empty());
            assert!(!responder.fallback_line().is_empty());
        }
    }
}
