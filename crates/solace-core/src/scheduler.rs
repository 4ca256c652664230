//! One-shot follow-up timers, one cancellable handle per elder.

use log::debug;
use parking_lot::Mutex;
use solace_protocol::ElderId;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Arms delayed follow-up tasks keyed by elder.
///
/// Re-arming replaces (and aborts) a stale timer for the same elder, so
/// at most one follow-up is pending per elder. The fired task itself
/// still checks whether the elder has re-engaged; the handle only
/// prevents stacking.
#[derive(Default)]
pub struct FollowUpScheduler {
    handles: Mutex<HashMap<ElderId, JoinHandle<()>>>,
}

impl FollowUpScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer that runs `task` after `delay`.
    pub fn schedule<F>(&self, elder_id: ElderId, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(
            "arming follow-up (elder_id={}, delay_secs={})",
            elder_id,
            delay.as_secs()
        );
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        if let Some(stale) = self.handles.lock().insert(elder_id, handle) {
            stale.abort();
        }
    }

    /// Abort a pending follow-up, if any.
    pub fn cancel(&self, elder_id: &str) {
        if let Some(handle) = self.handles.lock().remove(elder_id) {
            handle.abort();
            debug!("cancelled follow-up (elder_id={})", elder_id);
        }
    }

    /// Whether a follow-up is still pending for the elder.
    pub fn is_armed(&self, elder_id: &str) -> bool {
        self.handles
            .lock()
            .get(elder_id)
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::FollowUpScheduler;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn armed_task_fires_after_the_delay() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        scheduler.schedule("elder-1".to_string(), Duration::from_millis(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(scheduler.is_armed("elder-1"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed("elder-1"));
    }

    #[tokio::test]
    async fn rearming_replaces_the_stale_timer() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = fired.clone();
        scheduler.schedule("elder-1".to_string(), Duration::from_millis(20), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = fired.clone();
        scheduler.schedule("elder-1".to_string(), Duration::from_millis(20), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_the_task_from_firing() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        scheduler.schedule("elder-1".to_string(), Duration::from_millis(20), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.cancel("elder-1");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_armed("elder-1"));
    }
}
