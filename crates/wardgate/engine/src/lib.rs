//! Wardgate decision engine.
//!
//! Turns a zone's effective rule set plus live actor state into a
//! [`Decision`](wardgate_types::Decision), asynchronously: evaluation may
//! suspend on economy calls without blocking the worker that requested it.
//! The engine never mutates actor holdings itself — it returns a consumption
//! plan for the gating state machine to execute on the actor's owning context.

#![deny(unsafe_code)]

pub mod bypass;
pub mod cooldown;
pub mod economy;
pub mod engine;
pub mod error;
pub mod providers;

pub use bypass::BypassRegistry;
pub use cooldown::CooldownTracker;
pub use economy::{EconomyBridge, InMemoryLedger, LedgerBackend};
pub use engine::{DecisionEngine, ProbeReport, RuleVerdict};
pub use error::StoreError;
pub use providers::{AttributeProvider, HoldingsProvider, PermissionProvider};
