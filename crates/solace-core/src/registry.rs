//! In-memory registry of live connections and observer groups.

use crate::types::{ConnectionRole, Session};
use chrono::Utc;
use log::debug;
use parking_lot::RwLock;
use solace_protocol::{ConnectionId, ElderId, ElderProfile, ServerEvent};
use std::collections::HashMap;
use std::sync::Arc;

/// Outbound delivery seam for one connection.
///
/// Fire-and-forget: implementations must never block the caller. The
/// server backs this with an unbounded channel drained by the socket
/// writer task; tests back it with a recording buffer.
pub trait OutboundSink: Send + Sync {
    /// Deliver one event to the connection.
    fn send(&self, event: ServerEvent);
}

struct ElderEntry {
    session: Session,
    sink: Arc<dyn OutboundSink>,
}

/// Registry of elder sessions and family observer groups.
///
/// Owned by the gateway instance, never a process-global. All maps are
/// scoped by elder id; there is no cross-elder shared state.
#[derive(Default)]
pub struct SessionRegistry {
    elders: RwLock<HashMap<ElderId, ElderEntry>>,
    roles: RwLock<HashMap<ConnectionId, ConnectionRole>>,
    observers: RwLock<HashMap<ElderId, HashMap<ConnectionId, Arc<dyn OutboundSink>>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a connection as an elder's channel.
    ///
    /// Rejoining replaces any prior binding for the elder; the stale
    /// connection keeps its socket but no longer receives elder events.
    pub fn join(
        &self,
        connection_id: ConnectionId,
        elder_id: ElderId,
        profile: ElderProfile,
        sink: Arc<dyn OutboundSink>,
    ) -> Session {
        let session = Session {
            connection_id,
            elder_id: elder_id.clone(),
            profile,
            joined_at: Utc::now(),
        };
        debug!(
            "elder joined (elder_id={}, connection_id={})",
            elder_id, connection_id
        );
        self.roles.write().insert(
            connection_id,
            ConnectionRole::Elder {
                elder_id: elder_id.clone(),
            },
        );
        self.elders.write().insert(
            elder_id,
            ElderEntry {
                session: session.clone(),
                sink,
            },
        );
        session
    }

    /// Subscribe a connection to an elder's family observer group.
    pub fn join_family(
        &self,
        connection_id: ConnectionId,
        elder_id: ElderId,
        family_id: String,
        sink: Arc<dyn OutboundSink>,
    ) {
        debug!(
            "family observer joined (elder_id={}, family_id={}, connection_id={})",
            elder_id, family_id, connection_id
        );
        self.roles.write().insert(
            connection_id,
            ConnectionRole::FamilyObserver {
                elder_id: elder_id.clone(),
                family_id,
            },
        );
        self.observers
            .write()
            .entry(elder_id)
            .or_default()
            .insert(connection_id, sink);
    }

    /// Remove whatever binding the connection holds. No-op when the
    /// connection never joined.
    pub fn leave(&self, connection_id: ConnectionId) {
        let Some(role) = self.roles.write().remove(&connection_id) else {
            return;
        };
        match role {
            ConnectionRole::Elder { elder_id } => {
                let mut elders = self.elders.write();
                // A rejoin may already have replaced this binding.
                if elders
                    .get(&elder_id)
                    .is_some_and(|entry| entry.session.connection_id == connection_id)
                {
                    elders.remove(&elder_id);
                    debug!("elder left (elder_id={})", elder_id);
                }
            }
            ConnectionRole::FamilyObserver { elder_id, family_id } => {
                let mut observers = self.observers.write();
                if let Some(group) = observers.get_mut(&elder_id) {
                    group.remove(&connection_id);
                    if group.is_empty() {
                        observers.remove(&elder_id);
                    }
                }
                debug!(
                    "family observer left (elder_id={}, family_id={})",
                    elder_id, family_id
                );
            }
        }
    }

    /// Current session for an elder, absent when no live connection.
    pub fn lookup(&self, elder_id: &str) -> Option<Session> {
        self.elders
            .read()
            .get(elder_id)
            .map(|entry| entry.session.clone())
    }

    /// Role bound to a connection, if it ever joined.
    pub fn role(&self, connection_id: ConnectionId) -> Option<ConnectionRole> {
        self.roles.read().get(&connection_id).cloned()
    }

    /// Deliver an event to the elder's own channel.
    ///
    /// Events for an elder with no live connection are dropped, not
    /// queued. Returns whether the event was handed to a sink.
    pub fn send_to_elder(&self, elder_id: &str, event: ServerEvent) -> bool {
        let elders = self.elders.read();
        match elders.get(elder_id) {
            Some(entry) => {
                entry.sink.send(event);
                true
            }
            None => {
                debug!("dropping event for absent elder (elder_id={})", elder_id);
                false
            }
        }
    }

    /// Broadcast an event to every observer in the elder's family group.
    pub fn broadcast_family(&self, elder_id: &str, event: ServerEvent) {
        let observers = self.observers.read();
        if let Some(group) = observers.get(elder_id) {
            for sink in group.values() {
                sink.send(event.clone());
            }
        }
    }

    /// Number of observers subscribed to the elder's group.
    pub fn observer_count(&self, elder_id: &str) -> usize {
        self.observers
            .read()
            .get(elder_id)
            .map_or(0, |group| group.len())
    }
}
