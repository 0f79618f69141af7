//! The outcome of one gate evaluation, and the holdings it is computed from.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::ResourceKind;

/// Which rule caused a denial. Keys are stable and double as message lookup keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenyReason {
    Bypass,
    Permission,
    Items,
    Attribute,
    Economy,
    Cooldown,
}

impl DenyReason {
    /// Stable string key, used for reason-line lookup and logging.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Permission => "permission",
            Self::Items => "items",
            Self::Attribute => "attribute",
            Self::Economy => "economy",
            Self::Cooldown => "cooldown",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One step of a consumption plan: take `amount` from holding slot `slot`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDraw {
    pub slot: usize,
    pub amount: u32,
}

/// The immutable outcome of one evaluation.
///
/// A `Decision` carries no identity and is consumed by exactly one
/// continuation; the consumption plan inside it is therefore applied at most
/// once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    /// Rule tags that failed; only meaningful when denied.
    pub reasons: Vec<DenyReason>,
    /// Amount actually withdrawn, zero if nothing was.
    pub charged: Decimal,
    /// Consumption plan; empty unless allowed with a matched resource set.
    pub plan: Vec<SlotDraw>,
}

impl Decision {
    /// An allow with its charge and consumption plan.
    pub fn allow(charged: Decimal, plan: Vec<SlotDraw>) -> Self {
        Self {
            allowed: true,
            reasons: Vec::new(),
            charged,
            plan,
        }
    }

    /// A plain denial with no money moved.
    pub fn deny(reasons: Vec<DenyReason>) -> Self {
        Self {
            allowed: false,
            reasons,
            charged: Decimal::ZERO,
            plan: Vec::new(),
        }
    }

    /// A denial that keeps a non-refunded withdrawal as a sunk cost.
    pub fn deny_charged(reasons: Vec<DenyReason>, charged: Decimal) -> Self {
        Self {
            allowed: false,
            reasons,
            charged,
            plan: Vec::new(),
        }
    }
}

/// A stored tag value on a held resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagValue {
    Str(String),
    Int(i32),
    Long(i64),
    Double(f64),
}

/// One occupied holding slot as reported by the host runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub kind: ResourceKind,
    pub amount: u32,
    pub tags: HashMap<String, TagValue>,
}

impl Holding {
    /// A holding with no tags.
    pub fn new(kind: impl Into<ResourceKind>, amount: u32) -> Self {
        Self {
            kind: kind.into(),
            amount,
            tags: HashMap::new(),
        }
    }

    /// Builder-style tag attachment.
    pub fn with_tag(mut self, key: impl Into<String>, value: TagValue) -> Self {
        self.tags.insert(key.into(), value);
        self
    }
}
