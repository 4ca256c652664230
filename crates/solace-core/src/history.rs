//! Bounded in-memory conversation logs, one per elder.

use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use solace_protocol::{ChatMessage, ElderId, Role};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Invalidation seam for cached completion sessions.
///
/// Implemented by the companion engine so that clearing an elder's
/// history always discards the matching completion session: stale chat
/// history must never leak into a fresh session.
pub trait CompletionSessionCache: Send + Sync {
    /// Drop the cached completion session for an elder.
    fn clear_session(&self, elder_id: &str);
}

/// Per-elder message logs with FIFO eviction beyond the cap.
///
/// The cap is a memory bound, not a deletion contract; a durable history
/// may be kept by an external collaborator.
pub struct ConversationStore {
    logs: RwLock<HashMap<ElderId, VecDeque<ChatMessage>>>,
    cap: usize,
    session_cache: Option<Arc<dyn CompletionSessionCache>>,
}

impl ConversationStore {
    /// Create a store with the given per-elder cap and an optional
    /// completion-session cache to invalidate on `clear`.
    pub fn new(cap: usize, session_cache: Option<Arc<dyn CompletionSessionCache>>) -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
            cap,
            session_cache,
        }
    }

    /// Append one message, evicting oldest-first beyond the cap.
    pub fn append(&self, message: ChatMessage) {
        let mut logs = self.logs.write();
        let log = logs.entry(message.elder_id.clone()).or_default();
        log.push_back(message);
        while log.len() > self.cap {
            log.pop_front();
        }
    }

    /// Last `n` messages in chronological order; empty for an unknown
    /// elder.
    pub fn recent(&self, elder_id: &str, n: usize) -> Vec<ChatMessage> {
        let logs = self.logs.read();
        match logs.get(elder_id) {
            Some(log) => {
                let start = log.len().saturating_sub(n);
                log.iter().skip(start).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Number of stored messages for an elder.
    pub fn len(&self, elder_id: &str) -> usize {
        self.logs.read().get(elder_id).map_or(0, VecDeque::len)
    }

    /// Whether the elder has no stored messages.
    pub fn is_empty(&self, elder_id: &str) -> bool {
        self.len(elder_id) == 0
    }

    /// Timestamp of the most recent stored message, if any.
    pub fn last_timestamp(&self, elder_id: &str) -> Option<DateTime<Utc>> {
        self.logs
            .read()
            .get(elder_id)
            .and_then(|log| log.back())
            .map(|message| message.created_at)
    }

    /// Timestamp of the most recent user-authored message, if any.
    pub fn last_user_timestamp(&self, elder_id: &str) -> Option<DateTime<Utc>> {
        self.logs.read().get(elder_id).and_then(|log| {
            log.iter()
                .rev()
                .find(|message| message.role == Role::User)
                .map(|message| message.created_at)
        })
    }

    /// Drop the full log and invalidate the elder's completion session.
    pub fn clear(&self, elder_id: &str) {
        debug!("clearing conversation (elder_id={})", elder_id);
        self.logs.write().remove(elder_id);
        if let Some(cache) = &self.session_cache {
            cache.clear_session(elder_id);
        }
    }
}
