//! Per-actor suppression of identical messages within a short window.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use wardgate_types::ActorId;

/// Default suppression window for repeated identical messages.
pub const MESSAGE_WINDOW: Duration = Duration::from_secs(10);

/// Remembers the last message delivered to each actor and suppresses
/// re-delivery of identical text inside the window, so rapid repeated
/// attempts do not spam the same denial line.
#[derive(Debug)]
pub struct MessageThrottle {
    last: DashMap<ActorId, (String, Instant)>,
    window: Duration,
}

impl Default for MessageThrottle {
    fn default() -> Self {
        Self::with_window(MESSAGE_WINDOW)
    }
}

impl MessageThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            last: DashMap::new(),
            window,
        }
    }

    /// Whether this text should be delivered now; records the delivery when
    /// it should.
    pub fn should_send(&self, actor: &ActorId, text: &str) -> bool {
        let now = Instant::now();
        let suppress = self
            .last
            .get(actor)
            .is_some_and(|e| e.0 == text && now.duration_since(e.1) <= self.window);
        if suppress {
            return false;
        }
        self.last.insert(*actor, (text.to_string(), now));
        true
    }
}
