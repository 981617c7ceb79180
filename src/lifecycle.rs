//! Per-entity transient state
//!
//! Tracks dead/alive transitions, the respawn-apply window opened by a
//! dead -> alive transition, and the initializing / session-initialized
//! flags that guard first-contact launches. Each map has its own lock,
//! held only for a single read or update.

use skinguard_host::EntityId;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// How long after a respawn the starter outfit may be forced
pub const RESPAWN_WINDOW: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Unknown,
    Alive,
    Dead,
}

/// What an observation changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First sighting of the entity
    Appeared(LifeState),
    Died,
    /// Dead -> alive; the respawn window is now open
    Respawned,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct LifecycleTracker {
    dead: Mutex<HashMap<EntityId, bool>>,
    respawn_until: Mutex<HashMap<EntityId, Instant>>,
    initializing: Mutex<HashSet<EntityId>>,
    session_initialized: Mutex<HashSet<EntityId>>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current dead flag of an entity
    pub async fn observe(&self, id: EntityId, is_dead_now: bool) -> Transition {
        let was_dead = self.dead.lock().await.insert(id, is_dead_now);

        match (was_dead, is_dead_now) {
            (None, true) => Transition::Appeared(LifeState::Dead),
            (None, false) => Transition::Appeared(LifeState::Alive),
            (Some(false), true) => Transition::Died,
            (Some(true), false) => {
                self.respawn_until
                    .lock()
                    .await
                    .insert(id, Instant::now() + RESPAWN_WINDOW);
                Transition::Respawned
            }
            (Some(_), _) => Transition::Unchanged,
        }
    }

    pub async fn state(&self, id: EntityId) -> LifeState {
        match self.dead.lock().await.get(&id) {
            None => LifeState::Unknown,
            Some(true) => LifeState::Dead,
            Some(false) => LifeState::Alive,
        }
    }

    /// Whether the respawn window is open; an expired window is closed here
    pub async fn is_in_respawn_window(&self, id: EntityId) -> bool {
        let mut windows = self.respawn_until.lock().await;
        match windows.get(&id) {
            None => false,
            Some(until) if Instant::now() > *until => {
                windows.remove(&id);
                false
            }
            Some(_) => true,
        }
    }

    pub async fn clear_window(&self, id: EntityId) {
        self.respawn_until.lock().await.remove(&id);
    }

    /// Claim the first-contact launch for `id`
    ///
    /// Fails when the entity is already initializing or was initialized
    /// during this connection.
    pub async fn try_begin_init(&self, id: EntityId) -> bool {
        if self.session_initialized.lock().await.contains(&id) {
            return false;
        }
        self.initializing.lock().await.insert(id)
    }

    /// Release the initializing claim; only success marks the session
    pub async fn finish_init(&self, id: EntityId, success: bool) {
        self.initializing.lock().await.remove(&id);
        if success {
            self.session_initialized.lock().await.insert(id);
        }
    }

    pub async fn is_initializing(&self, id: EntityId) -> bool {
        self.initializing.lock().await.contains(&id)
    }

    pub async fn is_session_initialized(&self, id: EntityId) -> bool {
        self.session_initialized.lock().await.contains(&id)
    }

    /// Drop every record for one entity
    pub async fn forget(&self, id: EntityId) {
        self.dead.lock().await.remove(&id);
        self.respawn_until.lock().await.remove(&id);
        self.session_initialized.lock().await.remove(&id);
    }

    /// Drop records of entities that are no longer online
    ///
    /// The initializing set is left alone: an in-flight first contact clears
    /// its own claim when it notices the disconnect. Returns the number of
    /// entities whose records were removed.
    pub async fn purge_offline(&self, online: &HashSet<EntityId>) -> usize {
        let mut purged = HashSet::new();

        {
            let mut sessions = self.session_initialized.lock().await;
            sessions.retain(|id| keep_online(online, &mut purged, *id));
        }
        {
            let mut dead = self.dead.lock().await;
            dead.retain(|id, _| keep_online(online, &mut purged, *id));
        }
        {
            let mut windows = self.respawn_until.lock().await;
            windows.retain(|id, _| keep_online(online, &mut purged, *id));
        }

        purged.len()
    }

    /// Number of entities with any tracked record
    pub async fn tracked(&self) -> usize {
        let mut ids: HashSet<EntityId> = self.dead.lock().await.keys().copied().collect();
        ids.extend(self.respawn_until.lock().await.keys().copied());
        ids.extend(self.session_initialized.lock().await.iter().copied());
        ids.extend(self.initializing.lock().await.iter().copied());
        ids.len()
    }
}

fn keep_online(online: &HashSet<EntityId>, purged: &mut HashSet<EntityId>, id: EntityId) -> bool {
    if online.contains(&id) {
        return true;
    }
    purged.insert(id);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_transitions() {
        let tracker = LifecycleTracker::new();

        assert_eq!(tracker.state(1).await, LifeState::Unknown);
        assert_eq!(
            tracker.observe(1, false).await,
            Transition::Appeared(LifeState::Alive)
        );
        assert_eq!(tracker.observe(1, false).await, Transition::Unchanged);
        assert!(!tracker.is_in_respawn_window(1).await);

        assert_eq!(tracker.observe(1, true).await, Transition::Died);
        assert_eq!(tracker.observe(1, true).await, Transition::Unchanged);
        assert_eq!(tracker.state(1).await, LifeState::Dead);

        assert_eq!(tracker.observe(1, false).await, Transition::Respawned);
        assert_eq!(tracker.state(1).await, LifeState::Alive);
        assert!(tracker.is_in_respawn_window(1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sighting_dead_opens_no_window() {
        let tracker = LifecycleTracker::new();
        assert_eq!(
            tracker.observe(2, true).await,
            Transition::Appeared(LifeState::Dead)
        );
        assert!(!tracker.is_in_respawn_window(2).await);

        assert_eq!(tracker.observe(2, false).await, Transition::Respawned);
        assert!(tracker.is_in_respawn_window(2).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_respawn_window_expires() {
        let tracker = LifecycleTracker::new();
        tracker.observe(1, true).await;
        tracker.observe(1, false).await;

        tokio::time::advance(Duration::from_millis(7_900)).await;
        assert!(tracker.is_in_respawn_window(1).await);

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(!tracker.is_in_respawn_window(1).await);

        // Closed windows stay closed until the next respawn
        tracker.observe(1, false).await;
        assert!(!tracker.is_in_respawn_window(1).await);

        tracker.observe(1, true).await;
        tracker.observe(1, false).await;
        assert!(tracker.is_in_respawn_window(1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_window() {
        let tracker = LifecycleTracker::new();
        tracker.observe(1, true).await;
        tracker.observe(1, false).await;

        tracker.clear_window(1).await;
        assert!(!tracker.is_in_respawn_window(1).await);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!tracker.is_in_respawn_window(1).await);
    }

    #[tokio::test]
    async fn test_init_guards() {
        let tracker = LifecycleTracker::new();

        assert!(tracker.try_begin_init(5).await);
        assert!(!tracker.try_begin_init(5).await);
        assert!(tracker.is_initializing(5).await);

        // Failure releases the claim without marking the session
        tracker.finish_init(5, false).await;
        assert!(!tracker.is_initializing(5).await);
        assert!(!tracker.is_session_initialized(5).await);

        assert!(tracker.try_begin_init(5).await);
        tracker.finish_init(5, true).await;
        assert!(tracker.is_session_initialized(5).await);
        assert!(!tracker.try_begin_init(5).await);
    }

    #[tokio::test]
    async fn test_purge_offline() {
        let tracker = LifecycleTracker::new();
        tracker.observe(1, false).await;
        tracker.observe(2, true).await;
        tracker.observe(2, false).await;
        tracker.try_begin_init(2).await;
        tracker.finish_init(2, true).await;
        tracker.observe(3, false).await;

        let online: HashSet<EntityId> = [1].into_iter().collect();
        assert_eq!(tracker.purge_offline(&online).await, 2);

        assert_eq!(tracker.state(1).await, LifeState::Alive);
        assert_eq!(tracker.state(2).await, LifeState::Unknown);
        assert!(!tracker.is_in_respawn_window(2).await);
        assert!(!tracker.is_session_initialized(2).await);
        assert_eq!(tracker.tracked().await, 1);

        // Reconnect starts over
        assert!(tracker.try_begin_init(2).await);
    }

    #[tokio::test]
    async fn test_forget() {
        let tracker = LifecycleTracker::new();
        tracker.observe(9, true).await;
        tracker.observe(9, false).await;
        tracker.try_begin_init(9).await;
        tracker.finish_init(9, true).await;

        tracker.forget(9).await;
        assert_eq!(tracker.tracked().await, 0);
    }
}
