//! Per-(actor, zone) denial cooldown tracking.

use chrono::Utc;
use dashmap::DashMap;
use wardgate_types::{ActorId, ZoneId};

/// Records the last denial timestamp per (actor, zone) and answers whether an
/// actor is still suppressed from re-evaluation.
///
/// Entries are never evicted; growth is bounded by the number of distinct
/// (actor, zone) denial pairs and is an accepted tradeoff.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_denial: DashMap<(ActorId, ZoneId), i64>,
}

impl CooldownTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the actor's last denial for this zone is newer than the window.
    ///
    /// A window of zero means the cooldown feature is disabled.
    pub fn is_cooling(&self, actor: &ActorId, zone: &ZoneId, window_secs: u32) -> bool {
        if window_secs == 0 {
            return false;
        }
        let now = Utc::now().timestamp();
        self.last_denial
            .get(&(*actor, zone.clone()))
            .is_some_and(|last| now - *last < i64::from(window_secs))
    }

    /// Record a denial for (actor, zone) at the current time.
    pub fn mark(&self, actor: &ActorId, zone: &ZoneId) {
        self.last_denial
            .insert((*actor, zone.clone()), Utc::now().timestamp());
    }
}
