//! Core realtime companion primitives for Solace.
//!
//! This crate owns the gateway, session and conversation stores, the risk
//! assessor, the companion engine, and the follow-up scheduler used by the
//! server.

pub mod completion;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod history;
pub mod mood;
pub mod providers;
pub mod registry;
pub mod risk;
pub mod scheduler;
pub mod types;

pub use completion::{CompletionBackend, CompletionError, CompletionTurn, HttpCompletionBackend};
pub use engine::CompanionEngine;
pub use error::SolaceCoreError;
/// Gateway facade and outbound delivery seam.
pub use gateway::Gateway;
pub use history::{CompletionSessionCache, ConversationStore};
pub use providers::{
    DEMO_ELDER_ID, InMemoryProfileStore, ProfileStore, RoutineProvider, StaticRoutineProvider,
    demo_profile,
};
pub use registry::{OutboundSink, SessionRegistry};
pub use risk::assess;
pub use scheduler::FollowUpScheduler;
pub use types::{CompanionReply, ConnectionRole, ConversationContext, ProactiveReason, Session};
