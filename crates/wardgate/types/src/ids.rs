//! Identifier and location types for the wardgate world model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an actor (a player, agent, or other moving entity).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(Uuid);

impl ActorId {
    /// Wrap an existing UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random actor ID.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Name of a zone (a named partition of the world with its own rule set).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(String);

impl ZoneId {
    /// Create a new zone ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ZoneId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Kind of a held resource, as the host runtime names it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKind(String);

impl ResourceKind {
    /// Create a new resource kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A position within a zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Zone this position belongs to.
    pub zone: ZoneId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    /// Create a new location.
    pub fn new(zone: impl Into<ZoneId>, x: f64, y: f64, z: f64) -> Self {
        Self {
            zone: zone.into(),
            x,
            y,
            z,
        }
    }

    /// Block-granularity coordinates (floor of each axis).
    ///
    /// Pass tokens match on these, not on the raw floating-point position.
    pub fn block(&self) -> (i64, i64, i64) {
        (
            self.x.floor() as i64,
            self.y.floor() as i64,
            self.z.floor() as i64,
        )
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (bx, by, bz) = self.block();
        write!(f, "{} @ {},{},{}", self.zone, bx, by, bz)
    }
}
