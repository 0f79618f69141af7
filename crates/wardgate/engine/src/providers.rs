//! Boundary traits for the external lookups the engine consults.
//!
//! Permission and attribute lookups are synchronous or near-synchronous in
//! the host environments wardgate targets, so these traits stay blocking;
//! only the economy contract is async.

use wardgate_types::{ActorId, Holding};

/// Permission-node lookup against the host's permission service.
pub trait PermissionProvider: Send + Sync {
    /// Whether the actor holds the given permission node.
    fn has_permission(&self, actor: &ActorId, node: &str) -> bool;
}

/// Dynamic attribute expansion against an external attribute service.
///
/// The engine holds an `Option` of this provider; when the service is absent
/// the attribute rule fails outright rather than being skipped.
pub trait AttributeProvider: Send + Sync {
    /// Expand an expression for the actor; `None` when it cannot be resolved.
    fn expand(&self, actor: &ActorId, expression: &str) -> Option<String>;
}

/// Slot-indexed read access to an actor's current holdings.
pub trait HoldingsProvider: Send + Sync {
    /// Snapshot of the actor's holdings; `None` marks an empty slot.
    fn holdings(&self, actor: &ActorId) -> Vec<Option<Holding>>;
}
