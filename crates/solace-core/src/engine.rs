//! Companion engine: context-aware replies, proactive messages, and
//! camera mood classification, with deterministic local fallbacks.

use crate::completion::{CompletionBackend, CompletionTurn};
use crate::history::CompletionSessionCache;
use crate::mood::{detect_mood, parse_external_label, warrants_follow_up};
use crate::types::{CompanionReply, ConversationContext, ProactiveReason};
use log::{debug, warn};
use parking_lot::Mutex;
use solace_protocol::{ChatMessage, ElderId, Mood, Role, Routine};
use std::collections::HashMap;
use std::sync::Arc;

/// Messages from recent history used to seed a fresh completion session.
const SESSION_SEED_LEN: usize = 10;

const IMAGE_MOOD_PROMPT: &str = "You are analyzing the facial expression of an elderly person \
    for a care companion. Respond with exactly one word from this list: \
    happy, sad, anxious, lonely, neutral, distressed.";

/// One cached completion session; at most one exists per elder.
struct CompletionSession {
    system: String,
    turns: Vec<CompletionTurn>,
}

/// Turns a user message plus context into a reply, and generates
/// system-initiated messages.
///
/// Failure semantics: a backend error is never surfaced to the caller.
/// Every path degrades to deterministic local text, so the elder is
/// never left without a response.
pub struct CompanionEngine {
    backend: Option<Arc<dyn CompletionBackend>>,
    sessions: Mutex<HashMap<ElderId, CompletionSession>>,
    follow_up_delay_minutes: u32,
}

impl CompanionEngine {
    /// Create an engine; `backend: None` runs fallback-only.
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>, follow_up_delay_minutes: u32) -> Self {
        Self {
            backend,
            sessions: Mutex::new(HashMap::new()),
            follow_up_delay_minutes,
        }
    }

    /// Reply to one elder turn.
    pub async fn reply(&self, user_text: &str, ctx: &ConversationContext) -> CompanionReply {
        let mood = detect_mood(user_text);
        let should_follow_up = mood.is_some_and(warrants_follow_up);

        let text = match self.generated_reply(user_text, ctx).await {
            Some(text) => text,
            None => fallback_reply(user_text, ctx),
        };

        CompanionReply {
            message: ChatMessage::assistant(ctx.elder_id.clone(), text),
            mood,
            should_follow_up,
            follow_up_delay_minutes: should_follow_up.then_some(self.follow_up_delay_minutes),
        }
    }

    /// Generate a system-initiated message for the given reason.
    pub async fn proactive_message(
        &self,
        ctx: &ConversationContext,
        reason: ProactiveReason,
        routine: Option<&Routine>,
    ) -> CompanionReply {
        debug!(
            "generating proactive message (elder_id={}, reason={})",
            ctx.elder_id,
            reason.as_str()
        );
        let instruction = proactive_instruction(reason, routine, ctx);
        let text = match self.generated_one_shot(ctx, &instruction).await {
            Some(text) => text,
            None => proactive_fallback(reason, routine, ctx),
        };

        CompanionReply {
            message: ChatMessage::assistant(ctx.elder_id.clone(), text).proactive(),
            mood: None,
            should_follow_up: false,
            follow_up_delay_minutes: None,
        }
    }

    /// Generate an encouraging message after a routine was completed.
    pub async fn routine_encouragement(
        &self,
        ctx: &ConversationContext,
        routine_name: &str,
    ) -> CompanionReply {
        let instruction = format!(
            "{} just completed their routine \"{}\". Write one short, warm sentence \
             congratulating them.",
            ctx.profile.preferred_name, routine_name
        );
        let text = match self.generated_one_shot(ctx, &instruction).await {
            Some(text) => text,
            None => format!(
                "Wonderful, {}! You took care of \"{}\" — keep it up!",
                ctx.profile.preferred_name, routine_name
            ),
        };

        CompanionReply {
            message: ChatMessage::assistant(ctx.elder_id.clone(), text).proactive(),
            mood: None,
            should_follow_up: false,
            follow_up_delay_minutes: None,
        }
    }

    /// Classify an elder's mood from a camera frame.
    ///
    /// The external label is validated against the closed mood set;
    /// anything unparseable, and any backend failure, resolves to
    /// neutral.
    pub async fn analyze_image_mood(&self, image_base64: &str) -> Mood {
        let Some(backend) = &self.backend else {
            debug!("no completion backend, camera mood defaults to neutral");
            return Mood::Neutral;
        };
        match backend.classify_image(image_base64, IMAGE_MOOD_PROMPT).await {
            Ok(label) => parse_external_label(&label),
            Err(err) => {
                warn!("image mood classification failed, using neutral: {err}");
                Mood::Neutral
            }
        }
    }

    /// Drop the cached completion session for an elder.
    pub fn clear_session(&self, elder_id: &str) {
        if self.sessions.lock().remove(elder_id).is_some() {
            debug!("cleared completion session (elder_id={})", elder_id);
        }
    }

    /// Run one conversational turn against the backend, reusing the
    /// elder's cached session. `None` means the caller must fall back.
    async fn generated_reply(&self, user_text: &str, ctx: &ConversationContext) -> Option<String> {
        let backend = self.backend.as_ref()?;

        // Copy the session out so no lock is held across the call.
        let (system, mut turns) = {
            let mut sessions = self.sessions.lock();
            let session = sessions
                .entry(ctx.elder_id.clone())
                .or_insert_with(|| seed_session(ctx, user_text));
            (session.system.clone(), session.turns.clone())
        };
        turns.push(CompletionTurn::new(Role::User, user_text));

        match backend.chat(&system, &turns).await {
            Ok(text) => {
                let mut sessions = self.sessions.lock();
                if let Some(session) = sessions.get_mut(&ctx.elder_id) {
                    session.turns.push(CompletionTurn::new(Role::User, user_text));
                    session
                        .turns
                        .push(CompletionTurn::new(Role::Assistant, text.clone()));
                }
                Some(text)
            }
            Err(err) => {
                warn!(
                    "completion failed, using local fallback (elder_id={}): {err}",
                    ctx.elder_id
                );
                None
            }
        }
    }

    /// One-shot generation outside the cached session (proactive paths).
    async fn generated_one_shot(
        &self,
        ctx: &ConversationContext,
        instruction: &str,
    ) -> Option<String> {
        let backend = self.backend.as_ref()?;
        let turns = [CompletionTurn::new(Role::User, instruction)];
        match backend.chat(&persona_for(ctx), &turns).await {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(
                    "proactive completion failed, using canned text (elder_id={}): {err}",
                    ctx.elder_id
                );
                None
            }
        }
    }
}

impl CompletionSessionCache for CompanionEngine {
    fn clear_session(&self, elder_id: &str) {
        CompanionEngine::clear_session(self, elder_id);
    }
}

/// Seed a fresh completion session: persona plus the recent window.
///
/// The store already holds the turn being answered, so a trailing user
/// message matching `current_turn` is left out; the caller appends it
/// exactly once.
fn seed_session(ctx: &ConversationContext, current_turn: &str) -> CompletionSession {
    let mut recent = ctx.recent.as_slice();
    if let Some((last, rest)) = recent.split_last()
        && last.role == Role::User
        && last.content == current_turn
    {
        recent = rest;
    }
    let start = recent.len().saturating_sub(SESSION_SEED_LEN);
    let turns = recent[start..]
        .iter()
        .map(|message| CompletionTurn::new(message.role, message.content.clone()))
        .collect();
    CompletionSession {
        system: persona_for(ctx),
        turns,
    }
}

/// Build the persona instruction from the elder's profile and routines.
fn persona_for(ctx: &ConversationContext) -> String {
    let profile = &ctx.profile;
    let mut lines = vec![format!(
        "You are a warm, patient companion for {}, an elderly person. \
         Address them as {}. Keep replies short, kind, and concrete.",
        profile.display_name, profile.preferred_name
    )];
    if let Some(age) = profile.age {
        lines.push(format!("They are {age} years old."));
    }
    if !profile.interests.is_empty() {
        lines.push(format!("They enjoy: {}.", profile.interests.join(", ")));
    }
    if !profile.health_conditions.is_empty() {
        lines.push(format!(
            "Known health conditions: {}.",
            profile.health_conditions.join(", ")
        ));
    }
    if !profile.family.is_empty() {
        let family: Vec<String> = profile
            .family
            .iter()
            .map(|member| format!("{} ({})", member.name, member.relation))
            .collect();
        lines.push(format!("Their family: {}.", family.join(", ")));
    }
    if !ctx.active_routines.is_empty() {
        let names: Vec<&str> = ctx
            .active_routines
            .iter()
            .map(|routine| routine.name.as_str())
            .collect();
        lines.push(format!("Their daily routines: {}.", names.join(", ")));
    }
    lines.join(" ")
}

/// Deterministic reply keyed on simple substring matches.
fn fallback_reply(user_text: &str, ctx: &ConversationContext) -> String {
    let name = &ctx.profile.preferred_name;
    let text = user_text.to_lowercase();

    if text.contains("hello")
        || text == "hi"
        || text.starts_with("hi ")
        || text.contains("good morning")
        || text.contains("good evening")
    {
        format!("Hello {name}! It's lovely to hear from you. How are you feeling today?")
    } else if text.contains("how are you") {
        format!("I'm doing well, thank you for asking, {name}! I'm here to keep you company.")
    } else if text.contains("medication") || text.contains("medicine") || text.contains("pill") {
        format!(
            "It's good that you're thinking about your medication, {name}. \
             Have you taken everything for today?"
        )
    } else if text.contains("thank") {
        format!("You're very welcome, {name}. I'm always happy to chat with you.")
    } else if text.contains("bored") || text.contains("nothing to do") {
        match ctx.profile.interests.first() {
            Some(interest) => format!(
                "How about spending a little time on {interest}, {name}? \
                 You've told me you enjoy that."
            ),
            None => format!(
                "Shall we chat for a while, {name}? You could tell me about your day."
            ),
        }
    } else if text.contains("weather") {
        format!(
            "I can't see outside from here, {name}, but I hope it's pleasant. \
             A bit of fresh air can be lovely if it is."
        )
    } else {
        format!(
            "Thank you for sharing that with me, {name}. \
             I'm listening — would you like to tell me more?"
        )
    }
}

/// Prompt instruction for a proactive message.
fn proactive_instruction(
    reason: ProactiveReason,
    routine: Option<&Routine>,
    ctx: &ConversationContext,
) -> String {
    let name = &ctx.profile.preferred_name;
    match reason {
        ProactiveReason::CheckIn => format!(
            "Write one short, gentle message checking in on {name}, \
             who went quiet after a difficult moment."
        ),
        ProactiveReason::Loneliness => format!(
            "Write one short, warm message for {name}, who has been feeling lonely. \
             Suggest a small shared activity."
        ),
        ProactiveReason::RoutineReminder => {
            let routine_name = routine.map_or("their routine", |routine| routine.name.as_str());
            format!("Write one short, friendly reminder for {name} about \"{routine_name}\".")
        }
        ProactiveReason::MorningGreeting => {
            format!("Write one short, cheerful good-morning message for {name}.")
        }
        ProactiveReason::EveningWindDown => {
            format!("Write one short, calming good-evening message for {name}.")
        }
    }
}

/// Canned proactive message per reason.
fn proactive_fallback(
    reason: ProactiveReason,
    routine: Option<&Routine>,
    ctx: &ConversationContext,
) -> String {
    let name = &ctx.profile.preferred_name;
    match reason {
        ProactiveReason::CheckIn => format!(
            "Hello {name}, I was thinking about you. How are you feeling now? \
             I'm here whenever you'd like to talk."
        ),
        ProactiveReason::Loneliness => format!(
            "{name}, I'm right here with you. Would you like to chat for a bit, \
             or maybe we could plan a call with your family?"
        ),
        ProactiveReason::RoutineReminder => {
            let routine_name = routine.map_or("your routine", |routine| routine.name.as_str());
            format!("Just a gentle reminder, {name}: it's almost time for {routine_name}.")
        }
        ProactiveReason::MorningGreeting => format!(
            "Good morning, {name}! I hope you slept well. What would you like to do today?"
        ),
        ProactiveReason::EveningWindDown => format!(
            "Good evening, {name}. The day is winding down — time to relax and rest well."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::CompanionEngine;
    use crate::completion::{CompletionBackend, CompletionError, CompletionTurn};
    use crate::types::{ConversationContext, ProactiveReason};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use solace_protocol::{ChatMessage, Mood, Role};
    use std::sync::Arc;

    struct ScriptedBackend {
        reply: String,
        image_label: String,
        chat_calls: Mutex<Vec<Vec<CompletionTurn>>>,
    }

    impl ScriptedBackend {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                image_label: "neutral".to_string(),
                chat_calls: Mutex::new(Vec::new()),
            }
        }

        fn with_image_label(mut self, label: &str) -> Self {
            self.image_label = label.to_string();
            self
        }

        fn turn_contents(&self, call: usize) -> Vec<String> {
            self.chat_calls.lock()[call]
                .iter()
                .map(|turn| turn.content.clone())
                .collect()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn chat(
            &self,
            _system: &str,
            turns: &[CompletionTurn],
        ) -> Result<String, CompletionError> {
            self.chat_calls.lock().push(turns.to_vec());
            Ok(self.reply.clone())
        }

        async fn classify_image(
            &self,
            _image_base64: &str,
            _prompt: &str,
        ) -> Result<String, CompletionError> {
            Ok(self.image_label.clone())
        }
    }

    struct UnavailableBackend;

    #[async_trait]
    impl CompletionBackend for UnavailableBackend {
        async fn chat(
            &self,
            _system: &str,
            _turns: &[CompletionTurn],
        ) -> Result<String, CompletionError> {
            Err(CompletionError::Unavailable)
        }

        async fn classify_image(
            &self,
            _image_base64: &str,
            _prompt: &str,
        ) -> Result<String, CompletionError> {
            Err(CompletionError::Unavailable)
        }
    }

    fn ctx(elder_id: &str) -> ConversationContext {
        ConversationContext {
            elder_id: elder_id.to_string(),
            profile: crate::providers::demo_profile(elder_id),
            recent: Vec::new(),
            active_routines: Vec::new(),
            upcoming_routines: Vec::new(),
            last_interaction: None,
        }
    }

    #[tokio::test]
    async fn fallback_greets_without_a_backend() {
        let engine = CompanionEngine::new(None, 30);
        let reply = engine.reply("hello", &ctx("elder-1")).await;
        assert!(!reply.message.content.is_empty());
        assert!(reply.message.content.contains("Hello"));
        assert_eq!(reply.message.role, Role::Assistant);
    }

    #[tokio::test]
    async fn failing_backend_degrades_to_fallback() {
        let engine = CompanionEngine::new(Some(Arc::new(UnavailableBackend)), 30);
        let reply = engine.reply("thank you for everything", &ctx("elder-1")).await;
        assert!(reply.message.content.contains("welcome"));
    }

    #[tokio::test]
    async fn lonely_text_arms_a_follow_up() {
        let engine = CompanionEngine::new(None, 30);
        let reply = engine.reply("I feel so lonely tonight", &ctx("elder-1")).await;
        assert_eq!(reply.mood, Some(Mood::Lonely));
        assert!(reply.should_follow_up);
        assert_eq!(reply.follow_up_delay_minutes, Some(30));
    }

    #[tokio::test]
    async fn session_is_seeded_once_then_reused() {
        let backend = Arc::new(ScriptedBackend::new("a kind reply"));
        let engine = CompanionEngine::new(Some(backend.clone()), 30);

        let mut context = ctx("elder-1");
        context.recent = vec![
            ChatMessage::user("elder-1", "earlier question"),
            ChatMessage::assistant("elder-1", "earlier answer"),
        ];

        engine.reply("first turn", &context).await;
        engine.reply("second turn", &context).await;

        assert_eq!(backend.chat_calls.lock().len(), 2);
        // First call: seeded history plus the new turn.
        assert_eq!(
            backend.turn_contents(0),
            ["earlier question", "earlier answer", "first turn"]
        );
        // Second call appends only the new exchange, no reseeding.
        assert_eq!(
            backend.turn_contents(1),
            [
                "earlier question",
                "earlier answer",
                "first turn",
                "a kind reply",
                "second turn",
            ]
        );
    }

    #[tokio::test]
    async fn stored_current_turn_is_not_sent_twice() {
        let backend = Arc::new(ScriptedBackend::new("a kind reply"));
        let engine = CompanionEngine::new(Some(backend.clone()), 30);

        // The store appends the user turn before the engine is called,
        // so the context window already ends with it.
        let mut context = ctx("elder-1");
        context.recent = vec![
            ChatMessage::assistant("elder-1", "earlier answer"),
            ChatMessage::user("elder-1", "tell me about the garden"),
        ];

        engine.reply("tell me about the garden", &context).await;
        assert_eq!(
            backend.turn_contents(0),
            ["earlier answer", "tell me about the garden"]
        );

        // The cached session must hold the turn once as well.
        context.recent.push(ChatMessage::assistant("elder-1", "a kind reply"));
        context.recent.push(ChatMessage::user("elder-1", "next question"));
        engine.reply("next question", &context).await;
        assert_eq!(
            backend.turn_contents(1),
            [
                "earlier answer",
                "tell me about the garden",
                "a kind reply",
                "next question",
            ]
        );
    }

    #[tokio::test]
    async fn clearing_the_session_forces_a_reseed() {
        let backend = Arc::new(ScriptedBackend::new("ok"));
        let engine = CompanionEngine::new(Some(backend.clone()), 30);

        engine.reply("one", &ctx("elder-1")).await;
        engine.clear_session("elder-1");
        engine.reply("two", &ctx("elder-1")).await;

        assert_eq!(backend.turn_contents(1), ["two"]);
    }

    #[tokio::test]
    async fn image_mood_validates_external_labels() {
        let backend = Arc::new(
            ScriptedBackend::new("reply")
                .with_image_label("I think they look quite sad in this frame"),
        );
        let engine = CompanionEngine::new(Some(backend), 30);
        assert_eq!(engine.analyze_image_mood("aGVsbG8=").await, Mood::Sad);
    }

    #[tokio::test]
    async fn image_mood_defaults_to_neutral_on_failure() {
        let engine = CompanionEngine::new(Some(Arc::new(UnavailableBackend)), 30);
        assert_eq!(engine.analyze_image_mood("aGVsbG8=").await, Mood::Neutral);

        let engine = CompanionEngine::new(None, 30);
        assert_eq!(engine.analyze_image_mood("aGVsbG8=").await, Mood::Neutral);
    }

    #[tokio::test]
    async fn every_proactive_reason_has_a_canned_message() {
        let engine = CompanionEngine::new(None, 30);
        for reason in [
            ProactiveReason::CheckIn,
            ProactiveReason::Loneliness,
            ProactiveReason::RoutineReminder,
            ProactiveReason::MorningGreeting,
            ProactiveReason::EveningWindDown,
        ] {
            let reply = engine.proactive_message(&ctx("elder-1"), reason, None).await;
            assert!(!reply.message.content.is_empty(), "empty for {reason:?}");
            assert!(reply.message.meta.proactive);
            assert!(!reply.should_follow_up);
        }
    }
}
