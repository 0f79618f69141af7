//! Single-use pass tokens: how the machine's own re-issued transitions get
//! through the gate without looping.

use dashmap::DashMap;
use tracing::debug;

use wardgate_types::{ActorId, Location, ZoneId};

/// A marker bound to one exact destination, minted immediately before a
/// machine-issued transition and consumed by the next observation of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassToken {
    pub zone: ZoneId,
    pub bx: i64,
    pub by: i64,
    pub bz: i64,
}

impl PassToken {
    /// Token for the exact block the destination falls in.
    pub fn for_destination(to: &Location) -> Self {
        let (bx, by, bz) = to.block();
        Self {
            zone: to.zone.clone(),
            bx,
            by,
            bz,
        }
    }

    fn matches(&self, to: &Location) -> bool {
        let (bx, by, bz) = to.block();
        self.zone == to.zone && self.bx == bx && self.by == by && self.bz == bz
    }
}

/// Outstanding pass tokens keyed by actor, at most one per actor.
#[derive(Debug, Default)]
pub struct PassTokens {
    tokens: DashMap<ActorId, PassToken>,
}

impl PassTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a token to the actor, replacing any outstanding one.
    pub fn grant(&self, actor: &ActorId, token: PassToken) {
        self.tokens.insert(*actor, token);
    }

    /// Redeem the actor's token against an observed destination.
    ///
    /// True only on an exact match. A token that does not match is stale —
    /// the observation it was minted for will never arrive — so it is
    /// invalidated rather than left to misroute a later coincidental match.
    pub fn redeem(&self, actor: &ActorId, to: &Location) -> bool {
        let Some((_, token)) = self.tokens.remove(actor) else {
            return false;
        };
        let matched = token.matches(to);
        if !matched {
            debug!(actor = %actor, destination = %to, "stale pass token invalidated");
        }
        matched
    }
}
