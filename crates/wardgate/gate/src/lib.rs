//! Wardgate gating state machine.
//!
//! Intercepts zone-transition attempts, defers restricted ones to the
//! decision engine without blocking the observing worker, and resumes,
//! redirects, or pushes back the attempt from the result — with single-use
//! pass tokens against re-interception, at-most-once side effects, and
//! duplicate-message suppression.

#![deny(unsafe_code)]

pub mod host;
pub mod index;
pub mod machine;
pub mod messages;
pub mod throttle;
pub mod token;

pub use host::{ContextExecutor, GateVerdict, TransitionAttempt, TransitionCause, WorldHost};
pub use index::{GateIndex, GateSummary};
pub use machine::GateMachine;
pub use messages::MessageCatalog;
pub use throttle::MessageThrottle;
pub use token::{PassToken, PassTokens};
