//! Shared data model for conversations, profiles, routines, and risk.

use crate::{ElderId, MessageId, RoutineId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// One turn in an elder's conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Elder the conversation belongs to.
    pub elder_id: ElderId,
    /// Role that produced the message.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Timestamp for the message.
    pub created_at: DateTime<Utc>,
    /// Optional per-message metadata.
    #[serde(default)]
    pub meta: MessageMeta,
}

impl ChatMessage {
    /// Create a user-authored message stamped now.
    pub fn user(elder_id: impl Into<ElderId>, content: impl Into<String>) -> Self {
        Self::new(elder_id, Role::User, content)
    }

    /// Create an assistant-authored message stamped now.
    pub fn assistant(elder_id: impl Into<ElderId>, content: impl Into<String>) -> Self {
        Self::new(elder_id, Role::Assistant, content)
    }

    fn new(elder_id: impl Into<ElderId>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            elder_id: elder_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            meta: MessageMeta::default(),
        }
    }

    /// Attach a detected mood to the message.
    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.meta.mood = Some(mood);
        self
    }

    /// Mark the message as system-initiated.
    pub fn proactive(mut self) -> Self {
        self.meta.proactive = true;
        self
    }
}

/// Optional metadata attached to a chat message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageMeta {
    /// Mood detected from the message text, if any.
    #[serde(default)]
    pub mood: Option<Mood>,
    /// Whether the message relates to a routine.
    #[serde(default)]
    pub routine_related: bool,
    /// Coarse sentiment score in [-1.0, 1.0], if computed.
    #[serde(default)]
    pub sentiment: Option<f32>,
    /// Whether the message was system-initiated.
    #[serde(default)]
    pub proactive: bool,
}

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-generated message.
    System,
    /// Elder-authored message.
    User,
    /// Companion-authored message.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Closed mood vocabulary shared by the text heuristic and camera path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Anxious,
    Lonely,
    Neutral,
    Distressed,
}

impl Mood {
    /// Return the mood as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Anxious => "anxious",
            Mood::Lonely => "lonely",
            Mood::Neutral => "neutral",
            Mood::Distressed => "distressed",
        }
    }

    /// All moods, used for lenient matching of external labels.
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Anxious,
        Mood::Lonely,
        Mood::Neutral,
        Mood::Distressed,
    ];

    /// Whether the mood should surface a family alert.
    pub fn is_concerning(&self) -> bool {
        matches!(self, Mood::Sad | Mood::Anxious | Mood::Lonely | Mood::Distressed)
    }
}

impl FromStr for Mood {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == value)
            .ok_or(())
    }
}

/// Ordered risk severity derived from recent conversation text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Monitor,
    High,
    Critical,
}

impl RiskLevel {
    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Monitor => "monitor",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Output of one risk evaluation over a message window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskResult {
    /// Severity level for the window.
    pub level: RiskLevel,
    /// Human-readable contributing factors, in scan order.
    pub factors: Vec<String>,
}

impl RiskResult {
    /// A safe result with no contributing factors.
    pub fn safe() -> Self {
        Self {
            level: RiskLevel::Safe,
            factors: Vec::new(),
        }
    }
}

/// Identity and personalization data for one elder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElderProfile {
    /// Elder identifier.
    pub id: ElderId,
    /// Full display name.
    pub display_name: String,
    /// Name the companion addresses the elder by.
    pub preferred_name: String,
    /// Age in years.
    #[serde(default)]
    pub age: Option<u8>,
    /// IANA timezone name.
    #[serde(default)]
    pub timezone: Option<String>,
    /// BCP-47 language tag.
    #[serde(default)]
    pub language: Option<String>,
    /// Topics the elder enjoys talking about.
    #[serde(default)]
    pub interests: Vec<String>,
    /// Known health conditions.
    #[serde(default)]
    pub health_conditions: Vec<String>,
    /// Family members linked to this elder.
    #[serde(default)]
    pub family: Vec<FamilyMember>,
    /// UI and companion preferences.
    #[serde(default)]
    pub preferences: Preferences,
}

/// One family member linked to an elder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyMember {
    /// Family member name.
    pub name: String,
    /// Relation to the elder (daughter, son, ...).
    pub relation: String,
}

/// Elder-facing preference bag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    /// Whether spoken responses are enabled.
    #[serde(default)]
    pub voice_enabled: bool,
    /// Font scale multiplier for the elder UI.
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
    /// Named reminder tone.
    #[serde(default)]
    pub reminder_tone: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            voice_enabled: false,
            font_scale: default_font_scale(),
            reminder_tone: None,
        }
    }
}

fn default_font_scale() -> f32 {
    1.0
}

/// A scheduled recurring elder activity, owned by the routine provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Routine {
    /// Routine identifier.
    pub id: RoutineId,
    /// Elder the routine belongs to.
    pub elder_id: ElderId,
    /// Short human-readable name.
    pub name: String,
    /// Category of the routine.
    pub kind: RoutineKind,
    /// Next scheduled occurrence.
    pub scheduled_at: DateTime<Utc>,
    /// Whether the routine is currently active.
    #[serde(default)]
    pub active: bool,
}

/// Category of a routine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    Medication,
    Meal,
    Appointment,
    Exercise,
    Other,
}

#[cfg(test)]
mod tests {
    use super::{Mood, RiskLevel};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Safe < RiskLevel::Monitor);
        assert!(RiskLevel::Monitor < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn mood_parses_only_closed_vocabulary() {
        assert_eq!(Mood::from_str("  Lonely "), Ok(Mood::Lonely));
        assert_eq!(Mood::from_str("joyful"), Err(()));
    }

    #[test]
    fn concerning_moods_exclude_happy_and_neutral() {
        assert!(Mood::Distressed.is_concerning());
        assert!(Mood::Sad.is_concerning());
        assert!(!Mood::Happy.is_concerning());
        assert!(!Mood::Neutral.is_concerning());
    }
}
