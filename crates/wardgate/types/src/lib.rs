//! Core data model for the wardgate zone-gate engine.
//!
//! This crate holds the types shared by every wardgate component: identifiers
//! and locations, the five gate rules and their merge semantics, the loaded
//! configuration snapshot with its per-zone `effective` view, and the
//! `Decision` value the engine hands to the gating state machine.

#![deny(unsafe_code)]

pub mod config;
pub mod decision;
pub mod error;
pub mod ids;
pub mod rules;

pub use config::{GateConfig, GeneralConfig, MessagesConfig, ZoneOverride};
pub use decision::{Decision, DenyReason, Holding, SlotDraw, TagValue};
pub use error::ConfigError;
pub use ids::{ActorId, Location, ResourceKind, ZoneId};
pub use rules::{
    AttributeCheck, AttributeOp, AttributeRule, BypassRule, ChargeTiming, EconomyRule,
    EffectiveRuleSet, PermissionRule, ResourceRequirement, ResourceRule, ResourceSet,
    RestrictionMode, RuleLogic, RuleSet, TagCheck, TagKind,
};
