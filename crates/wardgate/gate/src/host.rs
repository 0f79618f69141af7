//! Host-runtime boundary: transition attempts, world access, and the
//! execution-context ownership primitive.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use wardgate_types::{ActorId, Holding, Location, ZoneId};

/// Cause tag carried by a transition attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionCause {
    /// Issued by a command or admin tooling.
    Command,
    /// A natural two-way portal; denials may deliver a hint line.
    NaturalPortal,
    /// A one-way portal with no safe reverse side; denials recoil the actor.
    OneWayPortal,
    /// A gateway whose safe reverse is the source location; denials return
    /// the actor there.
    ReturnGateway,
    Other,
}

/// One observed zone-transition attempt.
#[derive(Clone, Debug)]
pub struct TransitionAttempt {
    pub actor: ActorId,
    pub from: Location,
    pub to: Location,
    pub cause: TransitionCause,
}

/// What the observer should do with the attempt it reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateVerdict {
    /// Let the attempt continue untouched.
    Proceed,
    /// Cancel the attempt; the gating machine has taken over.
    Intercepted,
}

/// World access the gating machine needs from the host runtime.
///
/// Methods that touch a live actor (transitions, holdings, messages, recoil)
/// are only ever called from the context that owns that actor — the machine
/// routes them through a [`ContextExecutor`] first.
#[async_trait]
pub trait WorldHost: Send + Sync {
    /// Currently loaded zones.
    fn zones(&self) -> Vec<ZoneId>;

    /// Whether the actor is still connected.
    fn is_online(&self, actor: &ActorId) -> bool;

    /// Designated safe point of a zone, if the zone is loaded.
    fn safe_point(&self, zone: &ZoneId) -> Option<Location>;

    /// Issue a transition through the host primitive so it is re-observed.
    async fn issue_transition(&self, actor: &ActorId, to: Location) -> bool;

    /// Read one holding slot.
    async fn holding(&self, actor: &ActorId, slot: usize) -> Option<Holding>;

    /// Replace one holding slot; `None` clears it.
    async fn set_holding(&self, actor: &ActorId, slot: usize, holding: Option<Holding>);

    /// Deliver a message to the actor.
    async fn send_message(&self, actor: &ActorId, text: &str);

    /// Push the actor against its facing with the given horizontal strength
    /// and vertical lift.
    async fn apply_recoil(&self, actor: &ActorId, strength: f64, lift: f64);
}

/// Execution-context ownership primitive.
///
/// The host enforces strict data ownership by spatial/entity partition, so
/// the machine never assumes ambient single-threadedness: every task runs
/// where its subject is legitimately owned at that moment.
pub trait ContextExecutor: Send + Sync {
    /// Run a task on a context with no particular ownership.
    fn run_global(&self, task: BoxFuture<'static, ()>);

    /// Run a task on the context that owns the given actor.
    fn run_for_actor(&self, actor: &ActorId, task: BoxFuture<'static, ()>);

    /// Delayed variant of [`run_for_actor`](Self::run_for_actor).
    fn run_for_actor_later(&self, actor: &ActorId, delay: Duration, task: BoxFuture<'static, ()>);
}
