//! Wire protocol types for the Solace realtime channel and common types.

mod model;

pub use model::{
    ChatMessage, ElderProfile, FamilyMember, MessageMeta, Mood, Preferences, RiskLevel,
    RiskResult, Role, Routine, RoutineKind,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat message.
pub type MessageId = Uuid;
/// Unique identifier for a socket connection.
pub type ConnectionId = Uuid;
/// Identifier for an elder, owned by the external profile store.
pub type ElderId = String;
/// Identifier for a routine, owned by the external routine provider.
pub type RoutineId = String;

/// All events a client can send over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum ClientEvent {
    /// Elder joins (or rejoins) with an optional fresh profile.
    Join {
        elder_id: ElderId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profile: Option<ElderProfile>,
    },
    /// Elder sends one chat turn.
    Message {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elder_id: Option<ElderId>,
    },
    /// Elder is typing.
    Typing { elder_id: ElderId },
    /// Elder acknowledges a routine as done.
    RoutineAck {
        routine_id: RoutineId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elder_id: Option<ElderId>,
    },
    /// Elder submits a camera frame for mood analysis (base64 payload).
    Image {
        image: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elder_id: Option<ElderId>,
    },
    /// Family member joins as an observer for one elder.
    FamilyJoin { elder_id: ElderId, family_id: String },
}

/// All events the server emits to elder or family connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum ServerEvent {
    /// Stored conversation window replayed on join.
    History { messages: Vec<ChatMessage> },
    /// Assistant reply to a chat turn.
    Response { message: ChatMessage },
    /// Receipt for an accepted user message.
    Received { message_id: MessageId },
    /// Assistant typing indicator.
    TypingState { is_typing: bool },
    /// Routines due within the lookahead window.
    RoutinesUpcoming { routines: Vec<Routine> },
    /// System-initiated message (welcome, check-in, reminder).
    Proactive { message: ChatMessage },
    /// Mood detected from text or camera, echoed to the elder.
    MoodDetected {
        source: MoodSource,
        mood: Mood,
        timestamp: DateTime<Utc>,
    },
    /// Risk escalation pushed to the family observer group.
    RiskAlert {
        elder_id: ElderId,
        level: RiskLevel,
        factors: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// Concerning mood pushed to the family observer group.
    MoodAlert {
        elder_id: ElderId,
        mood: Mood,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<MoodSource>,
        timestamp: DateTime<Utc>,
    },
    /// Routine completion pushed to the family observer group.
    RoutineCompleted {
        elder_id: ElderId,
        routine_id: RoutineId,
        completed_at: DateTime<Utc>,
    },
    /// Elder typing indicator relayed to the family observer group.
    ElderTyping { elder_id: ElderId },
}

/// Origin of a mood observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoodSource {
    /// Keyword heuristic over the elder's text.
    Text,
    /// Vision classification of a camera frame.
    Camera,
}
