//! Core domain types shared by the classifier, responders, hand-off selector,
//! and orchestrator.
//!
//! Everything here is plain data: serializable, cloneable, and free of I/O.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a conversation session.
pub type SessionId = String;

/// Free-form diagnostic metadata attached to every response.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ── Classification ───────────────────────────────────────────────────

/// Category of a worry.
///
/// Declaration order is the tie-break priority used by the classifier: when
/// two categories score the same, the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorryCategory {
    Social,
    Health,
    Career,
    Finances,
    Relationships,
    Technology,
    Existential,
    /// No keyword matched.
    General,
}

impl WorryCategory {
    /// Categories that can be scored, in tie-break priority order.
    pub const SCORED: [WorryCategory; 7] = [
        Self::Social,
        Self::Health,
        Self::Career,
        Self::Finances,
        Self::Relationships,
        Self::Technology,
        Self::Existential,
    ];
}

impl std::fmt::Display for WorryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Social => write!(f, "social"),
            Self::Health => write!(f, "health"),
            Self::Career => write!(f, "career"),
            Self::Finances => write!(f, "finances"),
            Self::Relationships => write!(f, "relationships"),
            Self::Technology => write!(f, "technology"),
            Self::Existential => write!(f, "existential"),
            Self::General => write!(f, "general"),
        }
    }
}

/// A linguistic signal detected independently of the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    TimeSensitive,
    SocialJudgment,
    HealthAnxiety,
    CatastrophicThinking,
    Uncertainty,
}

impl EscalationTrigger {
    pub const ALL: [EscalationTrigger; 5] = [
        Self::TimeSensitive,
        Self::SocialJudgment,
        Self::HealthAnxiety,
        Self::CatastrophicThinking,
        Self::Uncertainty,
    ];
}

impl std::fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeSensitive => write!(f, "time_sensitive"),
            Self::SocialJudgment => write!(f, "social_judgment"),
            Self::HealthAnxiety => write!(f, "health_anxiety"),
            Self::CatastrophicThinking => write!(f, "catastrophic_thinking"),
            Self::Uncertainty => write!(f, "uncertainty"),
        }
    }
}

/// Result of classifying a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: WorryCategory,
    /// Ordered set, so serialized state is stable.
    pub triggers: BTreeSet<EscalationTrigger>,
}

impl Classification {
    pub fn general() -> Self {
        Self {
            category: WorryCategory::General,
            triggers: BTreeSet::new(),
        }
    }

    pub fn has(&self, trigger: EscalationTrigger) -> bool {
        self.triggers.contains(&trigger)
    }
}

impl std::str::FromStr for WorryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "social" => Ok(Self::Social),
            "health" => Ok(Self::Health),
            "career" => Ok(Self::Career),
            "finances" => Ok(Self::Finances),
            "relationships" => Ok(Self::Relationships),
            "technology" => Ok(Self::Technology),
            "existential" => Ok(Self::Existential),
            "general" => Ok(Self::General),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

impl std::str::FromStr for EscalationTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time_sensitive" => Ok(Self::TimeSensitive),
            "social_judgment" => Ok(Self::SocialJudgment),
            "health_anxiety" => Ok(Self::HealthAnxiety),
            "catastrophic_thinking" => Ok(Self::CatastrophicThinking),
            "uncertainty" => Ok(Self::Uncertainty),
            other => Err(format!("unknown trigger: {other}")),
        }
    }
}

// ── Anxiety ──────────────────────────────────────────────────────────

/// How alarmed the conversation currently sounds. Isomorphic to 0–4.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AnxietyLevel {
    #[default]
    Calm,
    Mild,
    Moderate,
    High,
    Extreme,
}

impl AnxietyLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Calm => 0,
            Self::Mild => 1,
            Self::Moderate => 2,
            Self::High => 3,
            Self::Extreme => 4,
        }
    }

    /// Convert from an integer, saturating at `Extreme`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Calm,
            1 => Self::Mild,
            2 => Self::Moderate,
            3 => Self::High,
            _ => Self::Extreme,
        }
    }

    /// Raise by `steps`, saturating at `Extreme`.
    pub fn raised(self, steps: u8) -> Self {
        Self::from_u8(self.as_u8().saturating_add(steps))
    }

    pub fn is_extreme(self) -> bool {
        self == Self::Extreme
    }
}

impl std::fmt::Display for AnxietyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calm => write!(f, "calm"),
            Self::Mild => write!(f, "mild"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
            Self::Extreme => write!(f, "extreme"),
        }
    }
}

// ── Responders ───────────────────────────────────────────────────────

/// Identifier of one of the six personas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderId {
    /// Trust-building first contact.
    Intake,
    /// Fabricated studies and percentages.
    Probability,
    /// Worst-case chains.
    Catastrophe,
    /// Invented deadlines.
    TimelinePanic,
    /// Imagined judgment by others.
    SocialAnxiety,
    /// Reassurance that undercuts itself.
    FalseComfort,
}

impl ResponderId {
    pub const ALL: [ResponderId; 6] = [
        Self::Intake,
        Self::Probability,
        Self::Catastrophe,
        Self::TimelinePanic,
        Self::SocialAnxiety,
        Self::FalseComfort,
    ];

    /// Human-facing persona name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Intake => "Dr. Intake McTherapy",
            Self::Probability => "Dr. Probability McStatistics",
            Self::Catastrophe => "Professor Catastrophe Von Doomsworth",
            Self::TimelinePanic => "Dr. Ticktock McUrgency",
            Self::SocialAnxiety => "Professor Socially Awkward Von Judgmental",
            Self::FalseComfort => "Dr. Comfort McBackstab",
        }
    }
}

impl std::fmt::Display for ResponderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::Probability => write!(f, "probability"),
            Self::Catastrophe => write!(f, "catastrophe"),
            Self::TimelinePanic => write!(f, "timeline_panic"),
            Self::SocialAnxiety => write!(f, "social_anxiety"),
            Self::FalseComfort => write!(f, "false_comfort"),
        }
    }
}

impl std::str::FromStr for ResponderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intake" => Ok(Self::Intake),
            "probability" => Ok(Self::Probability),
            "catastrophe" => Ok(Self::Catastrophe),
            "timeline_panic" => Ok(Self::TimelinePanic),
            "social_anxiety" => Ok(Self::SocialAnxiety),
            "false_comfort" => Ok(Self::FalseComfort),
            other => Err(format!("unknown responder: {other}")),
        }
    }
}

/// What happens after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "responder", rename_all = "snake_case")]
pub enum NextStep {
    Responder(ResponderId),
    Terminal,
}

impl NextStep {
    pub fn responder(self) -> Option<ResponderId> {
        match self {
            Self::Responder(id) => Some(id),
            Self::Terminal => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl std::fmt::Display for NextStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Responder(id) => write!(f, "{id}"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

// ── Conversation values ──────────────────────────────────────────────

/// The worry that opened an arc. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConcern {
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Index of the history turn this concern was raised in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_turn: Option<usize>,
}

impl UserConcern {
    pub fn new(text: impl Into<String>, prior_turn: Option<usize>) -> Self {
        Self {
            text: text.into(),
            created_at: Utc::now(),
            prior_turn,
        }
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Speaker {
    User,
    Responder(ResponderId),
    System,
}

/// One entry of the append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub anxiety: AnxietyLevel,
    /// Wall time the responder spent on this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_ms: Option<u64>,
}

impl Turn {
    pub fn new(speaker: Speaker, content: impl Into<String>, anxiety: AnxietyLevel) -> Self {
        Self {
            speaker,
            content: content.into(),
            timestamp: Utc::now(),
            anxiety,
            processing_ms: None,
        }
    }

    pub fn with_processing_ms(mut self, ms: u64) -> Self {
        self.processing_ms = Some(ms);
        self
    }

    /// Responder that produced this turn, if any.
    pub fn responder(&self) -> Option<ResponderId> {
        match self.speaker {
            Speaker::Responder(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.speaker == Speaker::User
    }
}

/// Output of a single responder turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub responder: ResponderId,
    pub content: String,
    pub anxiety_level: AnxietyLevel,
    pub next: NextStep,
    /// Closing message when this turn ended the arc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl AgentResponse {
    pub fn responder_name(&self) -> &'static str {
        self.responder.display_name()
    }
}

/// Result of a responder's readiness heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub reason: String,
    pub confidence: f32,
}
