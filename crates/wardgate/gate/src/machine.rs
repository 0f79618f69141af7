//! The gating state machine.
//!
//! Per in-flight attempt: `Observed -> Deferred -> {Resumed | Redirected |
//! PushedBack}`. The observing worker is never blocked — a restricted
//! attempt is cancelled immediately and its evaluation dispatched through
//! the execution-context primitive, with liveness re-affirmed after every
//! suspension point before side effects are applied.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use wardgate_engine::DecisionEngine;
use wardgate_types::{ActorId, Decision, SlotDraw, ZoneId};

use crate::host::{ContextExecutor, GateVerdict, TransitionAttempt, TransitionCause, WorldHost};
use crate::index::{GateIndex, GateSummary};
use crate::messages::MessageCatalog;
use crate::throttle::MessageThrottle;
use crate::token::{PassToken, PassTokens};

/// Horizontal strength of the immediate pushback from a one-way portal.
const RECOIL_STRENGTH: f64 = 0.85;
const RECOIL_LIFT: f64 = 0.55;
/// The softer follow-up nudge, shortly after.
const FOLLOW_UP_STRENGTH: f64 = 0.35;
const FOLLOW_UP_LIFT: f64 = 0.25;
const FOLLOW_UP_DELAY: Duration = Duration::from_millis(300);

/// Intercepts transition attempts and applies the resume/deny protocol.
///
/// Cheap to clone; clones share every collaborator. Each [`Decision`] is
/// consumed by exactly one continuation, so its side effects (consumption,
/// charge notice, pass token) apply at most once even when rapid attempts
/// race.
#[derive(Clone)]
pub struct GateMachine {
    engine: Arc<DecisionEngine>,
    index: Arc<GateIndex>,
    tokens: Arc<PassTokens>,
    throttle: Arc<MessageThrottle>,
    messages: Arc<RwLock<Arc<MessageCatalog>>>,
    host: Arc<dyn WorldHost>,
    executor: Arc<dyn ContextExecutor>,
}

impl GateMachine {
    pub fn new(
        engine: Arc<DecisionEngine>,
        index: Arc<GateIndex>,
        tokens: Arc<PassTokens>,
        host: Arc<dyn WorldHost>,
        executor: Arc<dyn ContextExecutor>,
        catalog: MessageCatalog,
    ) -> Self {
        Self {
            engine,
            index,
            tokens,
            throttle: Arc::new(MessageThrottle::new()),
            messages: Arc::new(RwLock::new(Arc::new(catalog))),
            host,
            executor,
        }
    }

    /// Swap in the message catalog from a freshly loaded configuration.
    pub fn reload_messages(&self, catalog: MessageCatalog) {
        *self.messages.write().unwrap() = Arc::new(catalog);
    }

    /// Rebuild the gate index from the engine's current configuration and
    /// the host's loaded zones.
    pub fn refresh_index(&self) {
        self.index.rebuild(&self.engine.config(), self.host.zones());
    }

    /// Observe a transition attempt.
    ///
    /// Returns [`GateVerdict::Intercepted`] when the caller must cancel the
    /// host event — the machine has dispatched the deferred evaluation and
    /// will resume or deny the attempt itself.
    pub fn observe(&self, attempt: TransitionAttempt) -> GateVerdict {
        // Only cross-zone moves are gated.
        if attempt.from.zone == attempt.to.zone {
            return GateVerdict::Proceed;
        }

        if self.tokens.redeem(&attempt.actor, &attempt.to) {
            debug!(actor = %attempt.actor, to = %attempt.to, "pass token redeemed, attempt is ours");
            return GateVerdict::Proceed;
        }

        let Some(summary) = self.index.summary(&attempt.to.zone) else {
            debug!(zone = %attempt.to.zone, "zone not indexed, attempt proceeds");
            return GateVerdict::Proceed;
        };
        if !summary.restricted {
            return GateVerdict::Proceed;
        }

        debug!(
            actor = %attempt.actor,
            zone = %attempt.to.zone,
            cause = ?attempt.cause,
            "restricted attempt intercepted, deferring"
        );
        self.defer(attempt, summary);
        GateVerdict::Intercepted
    }

    /// Re-check an actor whose zone membership changed through a path the
    /// interception did not observe.
    pub fn recheck_membership(&self, actor: ActorId, zone: ZoneId) {
        self.recheck(actor, zone, "membership-change");
    }

    /// Re-check an actor starting a session already inside a zone.
    pub fn recheck_on_join(&self, actor: ActorId, zone: ZoneId) {
        self.recheck(actor, zone, "session-start");
    }

    fn defer(&self, attempt: TransitionAttempt, summary: GateSummary) {
        let machine = self.clone();
        self.executor.run_global(Box::pin(async move {
            let decision = machine
                .engine
                .evaluate(&attempt.actor, &attempt.to.zone)
                .await;
            let actor = attempt.actor;
            let inner = machine.clone();
            machine.executor.run_for_actor(
                &actor,
                Box::pin(async move {
                    inner.settle(attempt, summary, decision).await;
                }),
            );
        }));
    }

    async fn settle(&self, attempt: TransitionAttempt, summary: GateSummary, decision: Decision) {
        if !self.host.is_online(&attempt.actor) {
            debug!(actor = %attempt.actor, "actor gone before settlement, dropping");
            return;
        }
        debug!(
            actor = %attempt.actor,
            allowed = decision.allowed,
            charged = %decision.charged,
            reasons = ?decision.reasons,
            "settling deferred attempt"
        );
        if decision.allowed {
            self.resume(attempt, summary, decision).await;
        } else {
            self.deny(attempt, decision).await;
        }
    }

    async fn resume(&self, attempt: TransitionAttempt, summary: GateSummary, decision: Decision) {
        if summary.consume_on_pass && !decision.plan.is_empty() {
            self.commit_consumption(&attempt.actor, &decision.plan).await;
        }
        if decision.charged > Decimal::ZERO {
            if let Some(line) = self.catalog().charged_line(&decision.charged) {
                self.deliver_throttled(&attempt.actor, &line).await;
            }
        }
        self.tokens
            .grant(&attempt.actor, PassToken::for_destination(&attempt.to));
        self.host
            .issue_transition(&attempt.actor, attempt.to.clone())
            .await;
        debug!(actor = %attempt.actor, to = %attempt.to, "attempt resumed");
    }

    async fn deny(&self, attempt: TransitionAttempt, decision: Decision) {
        let catalog = self.catalog();
        self.deliver_throttled(&attempt.actor, &catalog.denied_line(&attempt.to.zone))
            .await;
        for reason in &decision.reasons {
            if let Some(line) = catalog.reason_line(*reason) {
                self.deliver_throttled(&attempt.actor, &line).await;
            }
        }

        match attempt.cause {
            TransitionCause::NaturalPortal => {
                if let Some(hint) = catalog.portal_hint_line() {
                    self.deliver_throttled(&attempt.actor, &hint).await;
                }
            }
            TransitionCause::ReturnGateway => {
                // Safe reverse exists: put the actor back where it came from.
                self.host
                    .issue_transition(&attempt.actor, attempt.from.clone())
                    .await;
            }
            TransitionCause::OneWayPortal => {
                self.host
                    .apply_recoil(&attempt.actor, RECOIL_STRENGTH, RECOIL_LIFT)
                    .await;
                let machine = self.clone();
                let actor = attempt.actor;
                self.executor.run_for_actor_later(
                    &actor,
                    FOLLOW_UP_DELAY,
                    Box::pin(async move {
                        if !machine.host.is_online(&actor) {
                            return;
                        }
                        machine
                            .host
                            .apply_recoil(&actor, FOLLOW_UP_STRENGTH, FOLLOW_UP_LIFT)
                            .await;
                    }),
                );
            }
            _ => {}
        }
        debug!(actor = %attempt.actor, zone = %attempt.to.zone, reasons = ?decision.reasons, "attempt denied");
    }

    fn recheck(&self, actor: ActorId, zone: ZoneId, origin: &'static str) {
        let Some(summary) = self.index.summary(&zone) else {
            return;
        };
        if !summary.restricted {
            return;
        }

        let machine = self.clone();
        self.executor.run_global(Box::pin(async move {
            let decision = machine.engine.evaluate(&actor, &zone).await;
            let inner = machine.clone();
            machine.executor.run_for_actor(
                &actor,
                Box::pin(async move {
                    if decision.allowed {
                        return;
                    }
                    if !inner.host.is_online(&actor) {
                        return;
                    }
                    inner.force_to_fallback(&actor, &zone, origin).await;
                }),
            );
        }));
    }

    async fn force_to_fallback(&self, actor: &ActorId, from_zone: &ZoneId, origin: &'static str) {
        let catalog = self.catalog();
        let fallback = catalog.fallback_zone().clone();
        let Some(dest) = self.host.safe_point(&fallback) else {
            warn!(zone = %fallback, "fallback zone has no safe point, cannot relocate");
            return;
        };

        self.tokens.grant(actor, PassToken::for_destination(&dest));
        self.host.issue_transition(actor, dest.clone()).await;
        if let Some(line) = catalog.forced_out_line() {
            self.deliver_throttled(actor, &line).await;
        }
        debug!(actor = %actor, from = %from_zone, to = %dest, origin, "forced to fallback");
    }

    /// Execute a consumption plan against the actor's holdings.
    ///
    /// Slots that emptied since evaluation are skipped; there is no
    /// compensating action against an already-applied charge.
    async fn commit_consumption(&self, actor: &ActorId, plan: &[SlotDraw]) {
        for draw in plan {
            let Some(mut holding) = self.host.holding(actor, draw.slot).await else {
                continue;
            };
            if holding.amount <= draw.amount {
                self.host.set_holding(actor, draw.slot, None).await;
            } else {
                holding.amount -= draw.amount;
                self.host.set_holding(actor, draw.slot, Some(holding)).await;
            }
        }
    }

    async fn deliver_throttled(&self, actor: &ActorId, text: &str) {
        if self.throttle.should_send(actor, text) {
            self.host.send_message(actor, text).await;
        }
    }

    fn catalog(&self) -> Arc<MessageCatalog> {
        self.messages.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::future::BoxFuture;

    use wardgate_engine::{
        BypassRegistry, CooldownTracker, EconomyBridge, HoldingsProvider, InMemoryLedger,
        LedgerBackend, PermissionProvider,
    };
    use wardgate_types::{
        ChargeTiming, EconomyRule, GateConfig, GeneralConfig, Holding, Location, PermissionRule,
        ResourceKind, ResourceRequirement, ResourceRule, ResourceSet, RuleSet, ZoneOverride,
    };

    /* ---------------- test doubles ---------------- */

    /// Drains every submitted task to completion before the submitting call
    /// returns; delayed tasks run immediately, in submission order. Tasks
    /// submitted while draining are queued, never executed re-entrantly, so
    /// the protocol is fully deterministic under test.
    #[derive(Default)]
    struct InlineExecutor {
        queue: Mutex<std::collections::VecDeque<BoxFuture<'static, ()>>>,
        draining: std::sync::atomic::AtomicBool,
    }

    impl InlineExecutor {
        fn submit(&self, task: BoxFuture<'static, ()>) {
            use std::sync::atomic::Ordering;
            self.queue.lock().unwrap().push_back(task);
            if self.draining.swap(true, Ordering::SeqCst) {
                return;
            }
            loop {
                // Pop under the lock, run with it released.
                let next = self.queue.lock().unwrap().pop_front();
                let Some(task) = next else { break };
                futures::executor::block_on(task);
            }
            self.draining.store(false, Ordering::SeqCst);
        }
    }

    impl ContextExecutor for InlineExecutor {
        fn run_global(&self, task: BoxFuture<'static, ()>) {
            self.submit(task);
        }
        fn run_for_actor(&self, _actor: &ActorId, task: BoxFuture<'static, ()>) {
            self.submit(task);
        }
        fn run_for_actor_later(
            &self,
            _actor: &ActorId,
            _delay: Duration,
            task: BoxFuture<'static, ()>,
        ) {
            self.submit(task);
        }
    }

    #[derive(Default)]
    struct MockHost {
        zones: Mutex<Vec<ZoneId>>,
        offline: Mutex<HashSet<ActorId>>,
        slots: Mutex<HashMap<ActorId, Vec<Option<Holding>>>>,
        safe_points: Mutex<HashMap<ZoneId, Location>>,
        granted: Mutex<HashSet<String>>,
        messages: Mutex<Vec<(ActorId, String)>>,
        transitions: Mutex<Vec<(ActorId, Location)>>,
        recoils: Mutex<Vec<(ActorId, f64, f64)>>,
    }

    impl MockHost {
        fn stock(&self, actor: &ActorId, slots: Vec<Option<Holding>>) {
            self.slots.lock().unwrap().insert(*actor, slots);
        }
        fn set_offline(&self, actor: &ActorId) {
            self.offline.lock().unwrap().insert(*actor);
        }
        fn messages_for(&self, actor: &ActorId) -> Vec<String> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter(|(a, _)| a == actor)
                .map(|(_, m)| m.clone())
                .collect()
        }
        fn transitions_for(&self, actor: &ActorId) -> Vec<Location> {
            self.transitions
                .lock()
                .unwrap()
                .iter()
                .filter(|(a, _)| a == actor)
                .map(|(_, l)| l.clone())
                .collect()
        }
    }

    #[async_trait]
    impl WorldHost for MockHost {
        fn zones(&self) -> Vec<ZoneId> {
            self.zones.lock().unwrap().clone()
        }
        fn is_online(&self, actor: &ActorId) -> bool {
            !self.offline.lock().unwrap().contains(actor)
        }
        fn safe_point(&self, zone: &ZoneId) -> Option<Location> {
            self.safe_points.lock().unwrap().get(zone).cloned()
        }
        async fn issue_transition(&self, actor: &ActorId, to: Location) -> bool {
            self.transitions.lock().unwrap().push((*actor, to));
            true
        }
        async fn holding(&self, actor: &ActorId, slot: usize) -> Option<Holding> {
            self.slots
                .lock()
                .unwrap()
                .get(actor)
                .and_then(|slots| slots.get(slot).cloned())
                .flatten()
        }
        async fn set_holding(&self, actor: &ActorId, slot: usize, holding: Option<Holding>) {
            if let Some(slots) = self.slots.lock().unwrap().get_mut(actor) {
                if slot < slots.len() {
                    slots[slot] = holding;
                }
            }
        }
        async fn send_message(&self, actor: &ActorId, text: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((*actor, text.to_string()));
        }
        async fn apply_recoil(&self, actor: &ActorId, strength: f64, lift: f64) {
            self.recoils.lock().unwrap().push((*actor, strength, lift));
        }
    }

    impl PermissionProvider for MockHost {
        fn has_permission(&self, _actor: &ActorId, node: &str) -> bool {
            self.granted.lock().unwrap().contains(node)
        }
    }

    impl HoldingsProvider for MockHost {
        fn holdings(&self, actor: &ActorId) -> Vec<Option<Holding>> {
            self.slots
                .lock()
                .unwrap()
                .get(actor)
                .cloned()
                .unwrap_or_default()
        }
    }

    struct Fixture {
        machine: GateMachine,
        host: Arc<MockHost>,
        ledger: Arc<InMemoryLedger>,
        actor: ActorId,
    }

    /// Machine over one restricted zone `sanctum`, fallback zone `hub`.
    fn fixture(rules: RuleSet) -> Fixture {
        fixture_with(rules, 0)
    }

    fn fixture_with(rules: RuleSet, deny_cooldown_secs: u32) -> Fixture {
        let mut config = GateConfig {
            general: GeneralConfig {
                deny_cooldown_secs,
                ..GeneralConfig::default()
            },
            rules,
            ..GateConfig::default()
        };
        config
            .zones
            .insert(ZoneId::new("sanctum"), ZoneOverride::default());
        config
            .messages
            .reason_lines
            .insert("permission".into(), "You lack access.".into());

        let host = Arc::new(MockHost::default());
        *host.zones.lock().unwrap() = vec![ZoneId::new("meadow"), ZoneId::new("sanctum")];
        host.safe_points
            .lock()
            .unwrap()
            .insert(ZoneId::new("hub"), Location::new("hub", 0.5, 64.0, 0.5));

        let ledger = Arc::new(InMemoryLedger::new());
        let config = Arc::new(config);
        let engine = Arc::new(DecisionEngine::new(
            config.clone(),
            EconomyBridge::new(Some(ledger.clone() as Arc<dyn LedgerBackend>), None),
            Arc::new(BypassRegistry::in_memory()),
            Arc::new(CooldownTracker::new()),
            host.clone(),
            None,
            host.clone(),
        ));

        let machine = GateMachine::new(
            engine,
            Arc::new(GateIndex::new()),
            Arc::new(PassTokens::new()),
            host.clone(),
            Arc::new(InlineExecutor::default()),
            MessageCatalog::from_config(&config),
        );
        machine.refresh_index();

        Fixture {
            machine,
            host,
            ledger,
            actor: ActorId::random(),
        }
    }

    fn attempt(actor: ActorId, cause: TransitionCause) -> TransitionAttempt {
        TransitionAttempt {
            actor,
            from: Location::new("meadow", 100.0, 64.0, 100.0),
            to: Location::new("sanctum", 10.5, 70.0, -3.5),
            cause,
        }
    }

    fn consume_rule(kind: &str, amount: u32) -> ResourceRule {
        ResourceRule {
            enabled: true,
            consume_on_pass: true,
            any_of: vec![ResourceSet {
                required: vec![ResourceRequirement {
                    kind: ResourceKind::new(kind),
                    amount,
                    tag_checks: vec![],
                }],
            }],
        }
    }

    /* ---------------- protocol tests ---------------- */

    #[test]
    fn same_zone_moves_are_never_gated() {
        let fx = fixture(RuleSet::default());
        let verdict = fx.machine.observe(TransitionAttempt {
            actor: fx.actor,
            from: Location::new("sanctum", 0.0, 64.0, 0.0),
            to: Location::new("sanctum", 50.0, 64.0, 50.0),
            cause: TransitionCause::Other,
        });
        assert_eq!(verdict, GateVerdict::Proceed);
    }

    #[test]
    fn unrestricted_destination_proceeds() {
        let fx = fixture(RuleSet::default());
        let verdict = fx.machine.observe(TransitionAttempt {
            actor: fx.actor,
            from: Location::new("sanctum", 0.0, 64.0, 0.0),
            to: Location::new("meadow", 0.0, 64.0, 0.0),
            cause: TransitionCause::Other,
        });
        assert_eq!(verdict, GateVerdict::Proceed);
        assert!(fx.host.transitions_for(&fx.actor).is_empty());
    }

    #[test]
    fn allowed_attempt_is_resumed_through_a_pass_token() {
        // No rules enabled: restricted zone, ANY logic, vacuous pass.
        let fx = fixture(RuleSet::default());
        let att = attempt(fx.actor, TransitionCause::Other);

        assert_eq!(fx.machine.observe(att.clone()), GateVerdict::Intercepted);

        // The machine re-issued the transition toward the exact destination.
        assert_eq!(fx.host.transitions_for(&fx.actor), vec![att.to.clone()]);

        // Re-observing our own transition redeems the token and proceeds.
        assert_eq!(fx.machine.observe(att.clone()), GateVerdict::Proceed);

        // The token was single-use: a third identical attempt is gated again.
        assert_eq!(fx.machine.observe(att), GateVerdict::Intercepted);
    }

    #[test]
    fn consumption_and_charge_apply_on_resume() {
        let fx = fixture(RuleSet {
            items: consume_rule("relic_key", 3),
            economy: EconomyRule {
                enabled: true,
                timing: ChargeTiming::OnPass,
                min_balance: Decimal::ZERO,
                cost: Decimal::from(5),
                refund_on_deny: true,
            },
            ..RuleSet::default()
        });
        fx.host.stock(
            &fx.actor,
            vec![
                Some(Holding::new("relic_key", 2)),
                None,
                Some(Holding::new("relic_key", 3)),
            ],
        );
        fx.ledger.credit(&fx.actor, Decimal::from(20));

        let verdict = fx.machine.observe(attempt(fx.actor, TransitionCause::Command));
        assert_eq!(verdict, GateVerdict::Intercepted);

        // Plan of 3 applied exactly once: 2 taken from slot 0, 1 from slot 2.
        let slots = fx.host.slots.lock().unwrap().get(&fx.actor).cloned().unwrap();
        assert!(slots[0].is_none());
        assert_eq!(slots[2].as_ref().unwrap().amount, 2);

        assert_eq!(fx.ledger.balance_of(&fx.actor), Decimal::from(15));
        let messages = fx.host.messages_for(&fx.actor);
        assert_eq!(messages, vec!["Entry fee: 5.".to_string()]);
        assert_eq!(fx.host.transitions_for(&fx.actor).len(), 1);
    }

    #[test]
    fn denied_attempt_delivers_notice_and_reason_lines() {
        let fx = fixture(RuleSet {
            permission: PermissionRule {
                enabled: true,
                per_zone_node: false,
                custom_node: "wardgate.enter".into(),
            },
            ..RuleSet::default()
        });

        let verdict = fx.machine.observe(attempt(fx.actor, TransitionCause::Command));
        assert_eq!(verdict, GateVerdict::Intercepted);

        let messages = fx.host.messages_for(&fx.actor);
        assert_eq!(
            messages,
            vec![
                "You are not allowed to enter sanctum.".to_string(),
                "You lack access.".to_string(),
            ]
        );
        assert!(fx.host.transitions_for(&fx.actor).is_empty());
        assert!(fx.host.recoils.lock().unwrap().is_empty());
    }

    #[test]
    fn repeated_denials_are_throttled() {
        let fx = fixture_with(
            RuleSet {
                permission: PermissionRule {
                    enabled: true,
                    per_zone_node: false,
                    custom_node: "wardgate.enter".into(),
                },
                ..RuleSet::default()
            },
            30,
        );

        fx.machine.observe(attempt(fx.actor, TransitionCause::Command));
        fx.machine.observe(attempt(fx.actor, TransitionCause::Command));

        // Second attempt denies on cooldown; its identical denial text is
        // suppressed and cooldown has no configured reason line.
        let messages = fx.host.messages_for(&fx.actor);
        assert_eq!(
            messages,
            vec![
                "You are not allowed to enter sanctum.".to_string(),
                "You lack access.".to_string(),
            ]
        );
    }

    #[test]
    fn one_way_portal_denial_recoils_twice() {
        let fx = fixture(RuleSet {
            permission: PermissionRule {
                enabled: true,
                per_zone_node: false,
                custom_node: "wardgate.enter".into(),
            },
            ..RuleSet::default()
        });

        fx.machine
            .observe(attempt(fx.actor, TransitionCause::OneWayPortal));

        let recoils = fx.host.recoils.lock().unwrap().clone();
        assert_eq!(
            recoils,
            vec![
                (fx.actor, RECOIL_STRENGTH, RECOIL_LIFT),
                (fx.actor, FOLLOW_UP_STRENGTH, FOLLOW_UP_LIFT),
            ]
        );
    }

    #[test]
    fn return_gateway_denial_sends_the_actor_back() {
        let fx = fixture(RuleSet {
            permission: PermissionRule {
                enabled: true,
                per_zone_node: false,
                custom_node: "wardgate.enter".into(),
            },
            ..RuleSet::default()
        });
        let att = attempt(fx.actor, TransitionCause::ReturnGateway);

        fx.machine.observe(att.clone());

        assert_eq!(fx.host.transitions_for(&fx.actor), vec![att.from]);
    }

    #[test]
    fn offline_actor_settlement_is_a_no_op() {
        let fx = fixture(RuleSet::default());
        fx.host.set_offline(&fx.actor);

        let verdict = fx.machine.observe(attempt(fx.actor, TransitionCause::Other));
        assert_eq!(verdict, GateVerdict::Intercepted);
        assert!(fx.host.transitions_for(&fx.actor).is_empty());
        assert!(fx.host.messages_for(&fx.actor).is_empty());
    }

    #[test]
    fn backdoor_recheck_relocates_denied_actors() {
        let fx = fixture(RuleSet {
            permission: PermissionRule {
                enabled: true,
                per_zone_node: false,
                custom_node: "wardgate.enter".into(),
            },
            ..RuleSet::default()
        });

        fx.machine
            .recheck_membership(fx.actor, ZoneId::new("sanctum"));

        let transitions = fx.host.transitions_for(&fx.actor);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].zone, ZoneId::new("hub"));
        assert!(fx
            .host
            .messages_for(&fx.actor)
            .iter()
            .any(|m| m == "You were moved to a safe area."));

        // The relocation carries a pass token: observing it proceeds.
        let verdict = fx.machine.observe(TransitionAttempt {
            actor: fx.actor,
            from: Location::new("sanctum", 10.0, 70.0, -3.0),
            to: transitions[0].clone(),
            cause: TransitionCause::Other,
        });
        assert_eq!(verdict, GateVerdict::Proceed);
    }

    #[test]
    fn backdoor_recheck_passes_quietly_for_allowed_actors() {
        let fx = fixture(RuleSet::default());

        fx.machine.recheck_on_join(fx.actor, ZoneId::new("sanctum"));

        assert!(fx.host.transitions_for(&fx.actor).is_empty());
        assert!(fx.host.messages_for(&fx.actor).is_empty());
    }

    #[test]
    fn recheck_ignores_unrestricted_zones() {
        let fx = fixture(RuleSet {
            permission: PermissionRule {
                enabled: true,
                per_zone_node: false,
                custom_node: "wardgate.enter".into(),
            },
            ..RuleSet::default()
        });

        fx.machine.recheck_membership(fx.actor, ZoneId::new("meadow"));
        assert!(fx.host.transitions_for(&fx.actor).is_empty());
    }
}
