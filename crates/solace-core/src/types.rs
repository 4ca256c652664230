//! Core data types shared across the gateway API.

use chrono::{DateTime, Utc};
use solace_protocol::{ChatMessage, ConnectionId, ElderId, ElderProfile, Mood, Routine};

/// Role a connection plays after its first join event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRole {
    /// The monitored elder's own channel.
    Elder { elder_id: ElderId },
    /// A family member observing one elder's alerts.
    FamilyObserver { elder_id: ElderId, family_id: String },
}

impl ConnectionRole {
    /// Elder the connection is scoped to.
    pub fn elder_id(&self) -> &ElderId {
        match self {
            ConnectionRole::Elder { elder_id } => elder_id,
            ConnectionRole::FamilyObserver { elder_id, .. } => elder_id,
        }
    }
}

/// Ephemeral binding of a live connection to an elder.
#[derive(Debug, Clone)]
pub struct Session {
    /// Connection identifier.
    pub connection_id: ConnectionId,
    /// Elder the connection represents.
    pub elder_id: ElderId,
    /// Profile snapshot cached at join time.
    pub profile: ElderProfile,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

/// Derived, non-persisted view assembled per completion call.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    /// Elder the context belongs to.
    pub elder_id: ElderId,
    /// Profile snapshot.
    pub profile: ElderProfile,
    /// Most recent messages, chronological.
    pub recent: Vec<ChatMessage>,
    /// Currently active routines.
    pub active_routines: Vec<Routine>,
    /// Routines due within the lookahead window.
    pub upcoming_routines: Vec<Routine>,
    /// Timestamp of the last stored interaction, if any.
    pub last_interaction: Option<DateTime<Utc>>,
}

/// Structured response from the companion engine.
#[derive(Debug, Clone)]
pub struct CompanionReply {
    /// Assistant message, ready to append and emit.
    pub message: ChatMessage,
    /// Mood detected from the elder's text, if any.
    pub mood: Option<Mood>,
    /// Whether a proactive follow-up should be armed.
    pub should_follow_up: bool,
    /// Delay before the follow-up fires, when armed.
    pub follow_up_delay_minutes: Option<u32>,
}

/// Why a proactive message is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProactiveReason {
    /// Gentle check-in after a concerning exchange or on first join.
    CheckIn,
    /// The elder has expressed loneliness.
    Loneliness,
    /// A routine is due soon.
    RoutineReminder,
    /// Start-of-day greeting.
    MorningGreeting,
    /// End-of-day wind-down.
    EveningWindDown,
}

impl ProactiveReason {
    /// Return the reason as a snake_case string for prompts and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProactiveReason::CheckIn => "check_in",
            ProactiveReason::Loneliness => "loneliness",
            ProactiveReason::RoutineReminder => "routine_reminder",
            ProactiveReason::MorningGreeting => "morning_greeting",
            ProactiveReason::EveningWindDown => "evening_wind_down",
        }
    }
}
