//! External collaborator seams: routine provider and profile store.

use crate::error::SolaceCoreError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::debug;
use parking_lot::RwLock;
use solace_protocol::{ElderId, ElderProfile, FamilyMember, Preferences, Routine, RoutineId};
use std::collections::HashMap;

/// Elder identity used when an event arrives without full identity
/// wiring; keeps the system usable stand-alone.
pub const DEMO_ELDER_ID: &str = "demo-elder";

/// Read access to scheduled routines, owned by an external system.
#[async_trait]
pub trait RoutineProvider: Send + Sync {
    /// All currently active routines for an elder.
    async fn active(&self, elder_id: &str) -> Result<Vec<Routine>, SolaceCoreError>;

    /// Routines due within the lookahead window.
    async fn upcoming(
        &self,
        elder_id: &str,
        lookahead_minutes: u32,
    ) -> Result<Vec<Routine>, SolaceCoreError>;

    /// Forward an elder's completion acknowledgement to the provider.
    async fn acknowledge(&self, elder_id: &str, routine_id: &str)
    -> Result<(), SolaceCoreError>;
}

/// Read access to elder profiles, owned by an external store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile by elder id; `None` when unknown.
    async fn fetch(&self, elder_id: &str) -> Result<Option<ElderProfile>, SolaceCoreError>;
}

/// In-memory routine provider for stand-alone runs and tests.
#[derive(Default)]
pub struct StaticRoutineProvider {
    routines: RwLock<Vec<Routine>>,
    acknowledged: RwLock<Vec<(ElderId, RoutineId)>>,
}

impl StaticRoutineProvider {
    /// Create a provider with a fixed routine list.
    pub fn new(routines: Vec<Routine>) -> Self {
        Self {
            routines: RwLock::new(routines),
            acknowledged: RwLock::new(Vec::new()),
        }
    }

    /// Acknowledgements received so far, in arrival order.
    pub fn acknowledged(&self) -> Vec<(ElderId, RoutineId)> {
        self.acknowledged.read().clone()
    }
}

#[async_trait]
impl RoutineProvider for StaticRoutineProvider {
    async fn active(&self, elder_id: &str) -> Result<Vec<Routine>, SolaceCoreError> {
        Ok(self
            .routines
            .read()
            .iter()
            .filter(|routine| routine.elder_id == elder_id && routine.active)
            .cloned()
            .collect())
    }

    async fn upcoming(
        &self,
        elder_id: &str,
        lookahead_minutes: u32,
    ) -> Result<Vec<Routine>, SolaceCoreError> {
        let now = Utc::now();
        let horizon = now + Duration::minutes(i64::from(lookahead_minutes));
        Ok(self
            .routines
            .read()
            .iter()
            .filter(|routine| {
                routine.elder_id == elder_id
                    && routine.active
                    && routine.scheduled_at >= now
                    && routine.scheduled_at <= horizon
            })
            .cloned()
            .collect())
    }

    async fn acknowledge(
        &self,
        elder_id: &str,
        routine_id: &str,
    ) -> Result<(), SolaceCoreError> {
        debug!(
            "routine acknowledged (elder_id={}, routine_id={})",
            elder_id, routine_id
        );
        self.acknowledged
            .write()
            .push((elder_id.to_string(), routine_id.to_string()));
        Ok(())
    }
}

/// In-memory profile store for stand-alone runs and tests.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<ElderId, ElderProfile>>,
}

impl InMemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile.
    pub fn insert(&self, profile: ElderProfile) {
        self.profiles.write().insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch(&self, elder_id: &str) -> Result<Option<ElderProfile>, SolaceCoreError> {
        Ok(self.profiles.read().get(elder_id).cloned())
    }
}

/// Default profile backing the unknown-elder fallback.
pub fn demo_profile(elder_id: &str) -> ElderProfile {
    ElderProfile {
        id: elder_id.to_string(),
        display_name: "Margaret Walker".to_string(),
        preferred_name: "Margaret".to_string(),
        age: Some(78),
        timezone: Some("America/New_York".to_string()),
        language: Some("en-US".to_string()),
        interests: vec!["gardening".to_string(), "crossword puzzles".to_string()],
        health_conditions: vec!["arthritis".to_string()],
        family: vec![FamilyMember {
            name: "Susan".to_string(),
            relation: "daughter".to_string(),
        }],
        preferences: Preferences::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::{RoutineProvider, StaticRoutineProvider};
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use solace_protocol::{Routine, RoutineKind};

    fn routine(id: &str, elder_id: &str, minutes_from_now: i64, active: bool) -> Routine {
        Routine {
            id: id.to_string(),
            elder_id: elder_id.to_string(),
            name: format!("routine {id}"),
            kind: RoutineKind::Medication,
            scheduled_at: Utc::now() + Duration::minutes(minutes_from_now),
            active,
        }
    }

    #[tokio::test]
    async fn upcoming_filters_by_window_activity_and_elder() {
        let provider = StaticRoutineProvider::new(vec![
            routine("due", "elder-1", 10, true),
            routine("late", "elder-1", 90, true),
            routine("inactive", "elder-1", 10, false),
            routine("other-elder", "elder-2", 10, true),
        ]);

        let upcoming = provider.upcoming("elder-1", 30).await.expect("upcoming");
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "due");
    }

    #[tokio::test]
    async fn acknowledgements_are_recorded_in_order() {
        let provider = StaticRoutineProvider::new(Vec::new());
        provider.acknowledge("elder-1", "meds-am").await.expect("ack");
        provider.acknowledge("elder-1", "lunch").await.expect("ack");
        assert_eq!(
            provider.acknowledged(),
            vec![
                ("elder-1".to_string(), "meds-am".to_string()),
                ("elder-1".to_string(), "lunch".to_string()),
            ]
        );
    }
}
