//! Realtime gateway: routes client events through the stores, the risk
//! assessor, and the companion engine, and fans alerts out to family
//! observer groups.

use crate::completion::CompletionBackend;
use crate::engine::CompanionEngine;
use crate::error::SolaceCoreError;
use crate::history::ConversationStore;
use crate::mood::{detect_mood, sentiment_for, warrants_follow_up};
use crate::providers::{DEMO_ELDER_ID, ProfileStore, RoutineProvider, demo_profile};
use crate::registry::{OutboundSink, SessionRegistry};
use crate::risk;
use crate::scheduler::FollowUpScheduler;
use crate::types::{ConversationContext, ProactiveReason};
use chrono::{DateTime, Timelike, Utc};
use log::{debug, error, info, warn};
use solace_config::SolaceConfig;
use solace_protocol::{
    ChatMessage, ClientEvent, ConnectionId, ElderId, ElderProfile, Mood, MoodSource, RiskLevel,
    ServerEvent,
};
use std::sync::Arc;
use std::time::Duration;

/// Reply used when the message-handling sequence fails unexpectedly.
/// The elder never sees a technical error.
const EMPATHETIC_FALLBACK: &str = "I'm having a little trouble finding my words right now, \
    but I'm still here with you. Shall we try again in a moment?";

/// Orchestrates one process's realtime connections.
///
/// Owns all mutable state (registry, history, completion-session cache,
/// follow-up timers) as injectable instances so tests can construct
/// isolated gateways.
pub struct Gateway {
    config: SolaceConfig,
    registry: SessionRegistry,
    history: ConversationStore,
    engine: Arc<CompanionEngine>,
    scheduler: FollowUpScheduler,
    routines: Arc<dyn RoutineProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl Gateway {
    /// Assemble a gateway from config, an optional completion backend,
    /// and the external collaborators.
    pub fn new(
        config: SolaceConfig,
        backend: Option<Arc<dyn CompletionBackend>>,
        routines: Arc<dyn RoutineProvider>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Arc<Self> {
        let engine = Arc::new(CompanionEngine::new(
            backend,
            config.follow_up.delay_minutes,
        ));
        let history = ConversationStore::new(config.conversation.history_cap, Some(engine.clone()));
        Arc::new(Self {
            config,
            registry: SessionRegistry::new(),
            history,
            engine,
            scheduler: FollowUpScheduler::new(),
            routines,
            profiles,
        })
    }

    /// Dispatch one inbound client event.
    pub async fn handle_event(
        self: &Arc<Self>,
        connection_id: ConnectionId,
        sink: Arc<dyn OutboundSink>,
        event: ClientEvent,
    ) {
        match event {
            ClientEvent::Join { elder_id, profile } => {
                self.handle_join(connection_id, sink, elder_id, profile).await;
            }
            ClientEvent::Message { content, elder_id } => {
                self.handle_message(connection_id, elder_id, content).await;
            }
            ClientEvent::Typing { elder_id } => {
                self.registry
                    .broadcast_family(&elder_id, ServerEvent::ElderTyping { elder_id: elder_id.clone() });
            }
            ClientEvent::RoutineAck { routine_id, elder_id } => {
                self.handle_routine_ack(connection_id, elder_id, routine_id).await;
            }
            ClientEvent::Image { image, elder_id } => {
                self.handle_image(connection_id, elder_id, image).await;
            }
            ClientEvent::FamilyJoin { elder_id, family_id } => {
                self.registry.join_family(connection_id, elder_id, family_id, sink);
            }
        }
    }

    /// Deregister whatever the connection was bound to. Conversation
    /// history survives for the lifetime of the process.
    pub fn handle_disconnect(&self, connection_id: ConnectionId) {
        self.registry.leave(connection_id);
    }

    /// Drop an elder's history and cached completion session.
    pub fn clear_history(&self, elder_id: &str) {
        self.history.clear(elder_id);
    }

    /// Conversation store, exposed for tests and diagnostics.
    pub fn history(&self) -> &ConversationStore {
        &self.history
    }

    /// Session registry, exposed for tests and diagnostics.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Follow-up scheduler, exposed for tests and diagnostics.
    pub fn scheduler(&self) -> &FollowUpScheduler {
        &self.scheduler
    }

    async fn handle_join(
        self: &Arc<Self>,
        connection_id: ConnectionId,
        sink: Arc<dyn OutboundSink>,
        elder_id: ElderId,
        supplied: Option<ElderProfile>,
    ) {
        let profile = match supplied {
            Some(profile) => profile,
            None => self.fetch_profile(&elder_id).await,
        };
        let first_visit = self.history.is_empty(&elder_id);
        self.registry
            .join(connection_id, elder_id.clone(), profile, sink);
        info!(
            "elder session joined (elder_id={}, first_visit={})",
            elder_id, first_visit
        );

        if first_visit {
            let ctx = self.context_or_minimal(&elder_id).await;
            let reason = welcome_reason(Utc::now(), ctx.profile.timezone.as_deref());
            let reply = self.engine.proactive_message(&ctx, reason, None).await;
            self.history.append(reply.message.clone());
            self.registry.send_to_elder(
                &elder_id,
                ServerEvent::Proactive {
                    message: reply.message,
                },
            );
        } else {
            let messages = self
                .history
                .recent(&elder_id, self.config.conversation.replay_len);
            self.registry
                .send_to_elder(&elder_id, ServerEvent::History { messages });
        }

        match self
            .routines
            .upcoming(&elder_id, self.config.conversation.routine_lookahead_minutes)
            .await
        {
            Ok(routines) if !routines.is_empty() => {
                self.registry
                    .send_to_elder(&elder_id, ServerEvent::RoutinesUpcoming { routines });
            }
            Ok(_) => {}
            Err(err) => warn!("upcoming routines unavailable (elder_id={}): {err}", elder_id),
        }
    }

    async fn handle_message(
        self: &Arc<Self>,
        connection_id: ConnectionId,
        elder_id: Option<ElderId>,
        content: String,
    ) {
        let text = content.trim().to_string();
        if text.is_empty() {
            debug!("ignoring empty message (connection_id={})", connection_id);
            return;
        }
        let elder_id = self.resolve_elder(connection_id, elder_id).await;

        if let Err(err) = self.process_message(&elder_id, &text).await {
            error!("message handling failed (elder_id={}): {err}", elder_id);
            self.registry
                .send_to_elder(&elder_id, ServerEvent::TypingState { is_typing: false });
            let fallback = ChatMessage::assistant(elder_id.clone(), EMPATHETIC_FALLBACK);
            self.history.append(fallback.clone());
            self.registry
                .send_to_elder(&elder_id, ServerEvent::Response { message: fallback });
        }
    }

    /// The full chat sequence, in order: store, receipt, risk scan,
    /// typing, reply, alerts, follow-up. Any error is caught by
    /// `handle_message` and answered with the generic empathetic
    /// fallback.
    async fn process_message(
        self: &Arc<Self>,
        elder_id: &ElderId,
        text: &str,
    ) -> Result<(), SolaceCoreError> {
        let mood = detect_mood(text);
        let mut user_message = ChatMessage::user(elder_id.clone(), text);
        if let Some(mood) = mood {
            user_message = user_message.with_mood(mood);
            user_message.meta.sentiment = Some(sentiment_for(Some(mood)));
        }
        let message_id = user_message.id;
        self.history.append(user_message);
        self.registry
            .send_to_elder(elder_id, ServerEvent::Received { message_id });

        // Fire-and-forget: the alert must not block the reply path.
        let window = self
            .history
            .recent(elder_id, self.config.conversation.history_cap);
        let risk = risk::assess(&window);
        if risk.level >= RiskLevel::High {
            warn!(
                "risk threshold crossed (elder_id={}, level={}, factors={}, observers={})",
                elder_id,
                risk.level.as_str(),
                risk.factors.len(),
                self.registry.observer_count(elder_id)
            );
            self.registry.broadcast_family(
                elder_id,
                ServerEvent::RiskAlert {
                    elder_id: elder_id.clone(),
                    level: risk.level,
                    factors: risk.factors,
                    timestamp: Utc::now(),
                },
            );
        }

        self.registry
            .send_to_elder(elder_id, ServerEvent::TypingState { is_typing: true });
        let ctx = self.build_context(elder_id).await?;
        let reply = self.engine.reply(text, &ctx).await;

        self.history.append(reply.message.clone());
        self.registry
            .send_to_elder(elder_id, ServerEvent::TypingState { is_typing: false });
        self.registry.send_to_elder(
            elder_id,
            ServerEvent::Response {
                message: reply.message.clone(),
            },
        );

        if let Some(mood) = reply.mood
            && warrants_follow_up(mood)
        {
            self.registry.broadcast_family(
                elder_id,
                ServerEvent::MoodAlert {
                    elder_id: elder_id.clone(),
                    mood,
                    message: Some(text.to_string()),
                    source: Some(MoodSource::Text),
                    timestamp: Utc::now(),
                },
            );
        }

        if reply.should_follow_up {
            let delay = reply
                .follow_up_delay_minutes
                .unwrap_or(self.config.follow_up.delay_minutes);
            self.schedule_follow_up(elder_id.clone(), delay);
        }
        Ok(())
    }

    async fn handle_routine_ack(
        self: &Arc<Self>,
        connection_id: ConnectionId,
        elder_id: Option<ElderId>,
        routine_id: String,
    ) {
        let elder_id = self.resolve_elder(connection_id, elder_id).await;
        if let Err(err) = self.routines.acknowledge(&elder_id, &routine_id).await {
            warn!(
                "routine ack forwarding failed (elder_id={}, routine_id={}): {err}",
                elder_id, routine_id
            );
        }

        let ctx = self.context_or_minimal(&elder_id).await;
        let routine_name = ctx
            .active_routines
            .iter()
            .find(|routine| routine.id == routine_id)
            .map(|routine| routine.name.clone())
            .unwrap_or_else(|| routine_id.clone());
        let reply = self.engine.routine_encouragement(&ctx, &routine_name).await;
        self.history.append(reply.message.clone());
        self.registry.send_to_elder(
            &elder_id,
            ServerEvent::Proactive {
                message: reply.message,
            },
        );

        self.registry.broadcast_family(
            &elder_id,
            ServerEvent::RoutineCompleted {
                elder_id: elder_id.clone(),
                routine_id,
                completed_at: Utc::now(),
            },
        );
    }

    /// Camera-sourced distress bypasses the text assessor entirely: it
    /// is a direct escalation path.
    async fn handle_image(
        self: &Arc<Self>,
        connection_id: ConnectionId,
        elder_id: Option<ElderId>,
        image_base64: String,
    ) {
        let elder_id = self.resolve_elder(connection_id, elder_id).await;
        let mood = self.engine.analyze_image_mood(&image_base64).await;
        let now = Utc::now();
        debug!(
            "camera mood analyzed (elder_id={}, mood={})",
            elder_id,
            mood.as_str()
        );

        self.registry.send_to_elder(
            &elder_id,
            ServerEvent::MoodDetected {
                source: MoodSource::Camera,
                mood,
                timestamp: now,
            },
        );

        if mood.is_concerning() {
            self.registry.broadcast_family(
                &elder_id,
                ServerEvent::MoodAlert {
                    elder_id: elder_id.clone(),
                    mood,
                    message: None,
                    source: Some(MoodSource::Camera),
                    timestamp: now,
                },
            );
        }
        if mood == Mood::Distressed {
            self.registry.broadcast_family(
                &elder_id,
                ServerEvent::RiskAlert {
                    elder_id: elder_id.clone(),
                    level: RiskLevel::Critical,
                    factors: vec!["camera-detected distress".to_string()],
                    timestamp: now,
                },
            );
        }
    }

    /// Arm a follow-up; at fire time the elder's latest user message is
    /// compared against the arming instant, so a re-engaged elder is
    /// never pestered.
    fn schedule_follow_up(self: &Arc<Self>, elder_id: ElderId, delay_minutes: u32) {
        let scheduled_at = Utc::now();
        let gateway = Arc::downgrade(self);
        let elder = elder_id.clone();
        self.scheduler.schedule(
            elder_id,
            Duration::from_secs(u64::from(delay_minutes) * 60),
            async move {
                let Some(gateway) = gateway.upgrade() else {
                    return;
                };
                gateway.fire_follow_up(&elder, scheduled_at).await;
            },
        );
    }

    async fn fire_follow_up(&self, elder_id: &str, scheduled_at: chrono::DateTime<Utc>) {
        if self
            .history
            .last_user_timestamp(elder_id)
            .is_some_and(|ts| ts > scheduled_at)
        {
            debug!("skipping follow-up, elder re-engaged (elder_id={})", elder_id);
            return;
        }

        let ctx = self.context_or_minimal(elder_id).await;
        let reply = self
            .engine
            .proactive_message(&ctx, ProactiveReason::CheckIn, None)
            .await;
        self.history.append(reply.message.clone());
        // Elder's own channel only; family is not notified of check-ins.
        self.registry.send_to_elder(
            elder_id,
            ServerEvent::Proactive {
                message: reply.message,
            },
        );
    }

    /// Elder id for an event: explicit id wins, then the connection's
    /// join binding, then the demo elder.
    ///
    /// An explicit id is only honored when it maps to something real: the
    /// connection's own binding, a live session, or a stored profile.
    /// Anything else resolves to the demo elder so history is never
    /// written under an identity that was never introduced.
    async fn resolve_elder(
        &self,
        connection_id: ConnectionId,
        explicit: Option<ElderId>,
    ) -> ElderId {
        let bound = self.registry.role(connection_id);
        if let Some(elder_id) = explicit
            && !elder_id.is_empty()
        {
            if bound.as_ref().is_some_and(|role| role.elder_id() == &elder_id)
                || self.registry.lookup(&elder_id).is_some()
            {
                return elder_id;
            }
            if matches!(self.profiles.fetch(&elder_id).await, Ok(Some(_))) {
                return elder_id;
            }
            debug!(
                "unknown explicit elder id, using demo elder (elder_id={})",
                elder_id
            );
            return DEMO_ELDER_ID.to_string();
        }
        match bound {
            Some(role) => role.elder_id().clone(),
            None => DEMO_ELDER_ID.to_string(),
        }
    }

    /// Profile for an elder: live session snapshot, then the profile
    /// store, then the demo profile.
    async fn fetch_profile(&self, elder_id: &str) -> ElderProfile {
        if let Some(session) = self.registry.lookup(elder_id) {
            return session.profile;
        }
        match self.profiles.fetch(elder_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => demo_profile(elder_id),
            Err(err) => {
                warn!("profile fetch failed (elder_id={}): {err}", elder_id);
                demo_profile(elder_id)
            }
        }
    }

    /// Assemble the per-call completion context. Provider failures
    /// propagate so the caller's catch-all can answer with the generic
    /// fallback.
    async fn build_context(&self, elder_id: &str) -> Result<ConversationContext, SolaceCoreError> {
        let profile = self.fetch_profile(elder_id).await;
        let active_routines = self.routines.active(elder_id).await?;
        let upcoming_routines = self
            .routines
            .upcoming(elder_id, self.config.conversation.routine_lookahead_minutes)
            .await?;
        Ok(ConversationContext {
            elder_id: elder_id.to_string(),
            profile,
            recent: self.history.recent(elder_id, 10),
            active_routines,
            upcoming_routines,
            last_interaction: self.history.last_timestamp(elder_id),
        })
    }

    /// Context with provider failures degraded to empty routine lists;
    /// used by paths that must produce a message regardless.
    async fn context_or_minimal(&self, elder_id: &str) -> ConversationContext {
        match self.build_context(elder_id).await {
            Ok(ctx) => ctx,
            Err(err) => {
                warn!("context degraded (elder_id={}): {err}", elder_id);
                ConversationContext {
                    elder_id: elder_id.to_string(),
                    profile: self.fetch_profile(elder_id).await,
                    recent: self.history.recent(elder_id, 10),
                    active_routines: Vec::new(),
                    upcoming_routines: Vec::new(),
                    last_interaction: self.history.last_timestamp(elder_id),
                }
            }
        }
    }
}

/// Welcome reason for a first visit, by the elder's local time of day.
/// An absent or unparseable timezone falls back to UTC.
fn welcome_reason(now: DateTime<Utc>, timezone: Option<&str>) -> ProactiveReason {
    let hour = timezone
        .and_then(|name| name.parse::<chrono_tz::Tz>().ok())
        .map_or_else(|| now.hour(), |tz| now.with_timezone(&tz).hour());
    if (5..17).contains(&hour) {
        ProactiveReason::MorningGreeting
    } else {
        ProactiveReason::EveningWindDown
    }
}
