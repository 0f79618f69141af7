//! The decision engine: effective rules + live actor state -> [`Decision`].

use std::sync::{Arc, RwLock};

use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use wardgate_types::{
    ActorId, AttributeCheck, AttributeOp, AttributeRule, ChargeTiming, Decision, DenyReason,
    EffectiveRuleSet, GateConfig, Holding, ResourceSet, RuleLogic, SlotDraw, TagCheck, TagKind,
    TagValue, ZoneId,
};

use crate::bypass::BypassRegistry;
use crate::cooldown::CooldownTracker;
use crate::economy::EconomyBridge;
use crate::providers::{AttributeProvider, HoldingsProvider, PermissionProvider};

/// Evaluates zone-transition attempts against a zone's effective rule set.
///
/// `evaluate` is infallible by construction: every external failure degrades
/// to a denial, never to an error. The engine holds the configuration
/// snapshot behind a lock only to swap it wholesale on reload; each
/// evaluation clones the `Arc` once and works lock-free from there.
pub struct DecisionEngine {
    config: RwLock<Arc<GateConfig>>,
    economy: EconomyBridge,
    bypass: Arc<BypassRegistry>,
    cooldowns: Arc<CooldownTracker>,
    permissions: Arc<dyn PermissionProvider>,
    attributes: Option<Arc<dyn AttributeProvider>>,
    holdings: Arc<dyn HoldingsProvider>,
}

impl DecisionEngine {
    pub fn new(
        config: Arc<GateConfig>,
        economy: EconomyBridge,
        bypass: Arc<BypassRegistry>,
        cooldowns: Arc<CooldownTracker>,
        permissions: Arc<dyn PermissionProvider>,
        attributes: Option<Arc<dyn AttributeProvider>>,
        holdings: Arc<dyn HoldingsProvider>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            economy,
            bypass,
            cooldowns,
            permissions,
            attributes,
            holdings,
        }
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Arc<GateConfig> {
        self.config.read().unwrap().clone()
    }

    /// Swap in a freshly loaded configuration snapshot.
    pub fn update_config(&self, config: Arc<GateConfig>) {
        *self.config.write().unwrap() = config;
    }

    /// The merged rule set governing a zone (reporting/dry-run accessor).
    pub fn effective(&self, zone: &ZoneId) -> EffectiveRuleSet {
        self.config().effective(zone)
    }

    /// Evaluate a transition of `actor` into `zone`.
    ///
    /// The only side effect is the cooldown mark a denial records; allowed
    /// results never touch the cooldown store and never mutate holdings —
    /// the returned plan is executed elsewhere, on the actor's owning
    /// context.
    pub async fn evaluate(&self, actor: &ActorId, zone: &ZoneId) -> Decision {
        let config = self.config();
        let eff = config.effective(zone);
        debug!(
            zone = %zone,
            restricted = eff.restricted,
            logic = ?eff.rule_logic,
            cooldown = eff.deny_cooldown_secs,
            "evaluating transition"
        );
        if !eff.restricted {
            return Decision::allow(Decimal::ZERO, Vec::new());
        }

        if self
            .cooldowns
            .is_cooling(actor, zone, eff.deny_cooldown_secs)
        {
            debug!(actor = %actor, zone = %zone, "cooling, denied without evaluation");
            return Decision::deny(vec![DenyReason::Cooldown]);
        }

        let rules = &eff.rules;
        let mut reasons = Vec::new();

        let mut bypass_ok = false;
        if rules.bypass.enabled {
            let flag = self.bypass.has(actor);
            let node = self
                .permissions
                .has_permission(actor, &rules.bypass.permission_node);
            bypass_ok = flag || node;
            debug!(flag, node, ok = bypass_ok, "bypass rule");
            if !bypass_ok {
                reasons.push(DenyReason::Bypass);
            }
        }

        let mut permission_ok = false;
        if rules.permission.enabled {
            let node = if rules.permission.per_zone_node {
                format!("{}.{}", rules.permission.custom_node, zone.as_str())
            } else {
                rules.permission.custom_node.clone()
            };
            permission_ok = self.permissions.has_permission(actor, &node);
            debug!(node = %node, ok = permission_ok, "permission rule");
            if !permission_ok {
                reasons.push(DenyReason::Permission);
            }
        }

        let mut items_ok = false;
        let mut plan = Vec::new();
        if rules.items.enabled {
            match match_any_of(&self.holdings.holdings(actor), &rules.items.any_of) {
                Some(draws) => {
                    items_ok = true;
                    plan = draws;
                }
                None => reasons.push(DenyReason::Items),
            }
            debug!(ok = items_ok, draws = plan.len(), "resource rule");
        }

        let mut attributes_ok = false;
        if rules.attributes.enabled {
            attributes_ok = self.attributes_pass(actor, &rules.attributes);
            if !attributes_ok {
                reasons.push(DenyReason::Attribute);
            }
        }

        let pass_non_economy = match eff.rule_logic {
            RuleLogic::All => {
                (!rules.bypass.enabled || bypass_ok)
                    && (!rules.permission.enabled || permission_ok)
                    && (!rules.items.enabled || items_ok)
                    && (!rules.attributes.enabled || attributes_ok)
            }
            RuleLogic::Any => {
                !rules.any_non_economy_enabled()
                    || bypass_ok
                    || permission_ok
                    || items_ok
                    || attributes_ok
            }
        };
        debug!(pass = pass_non_economy, ?reasons, "non-economy verdict");

        let eco = &rules.economy;
        if !eco.enabled {
            return self.finalize(pass_non_economy, reasons, actor, zone, plan, Decimal::ZERO);
        }

        match eco.timing {
            ChargeTiming::None => {
                self.finalize(pass_non_economy, reasons, actor, zone, plan, Decimal::ZERO)
            }
            ChargeTiming::OnAttempt => {
                let balance = self.economy.balance(actor).await;
                debug!(%balance, min = %eco.min_balance, cost = %eco.cost, "economy (on-attempt)");
                if eco.min_balance > Decimal::ZERO && balance < eco.min_balance {
                    reasons.push(DenyReason::Economy);
                    return self.finalize(false, reasons, actor, zone, Vec::new(), Decimal::ZERO);
                }
                if eco.cost > Decimal::ZERO {
                    let ok = self.economy.withdraw(actor, eco.cost).await;
                    debug!(ok, cost = %eco.cost, "withdraw (on-attempt)");
                    if !ok {
                        reasons.push(DenyReason::Economy);
                        return self.finalize(
                            false,
                            reasons,
                            actor,
                            zone,
                            Vec::new(),
                            Decimal::ZERO,
                        );
                    }
                    if !pass_non_economy {
                        if eco.refund_on_deny {
                            self.economy.deposit(actor, eco.cost).await;
                            return self.finalize(
                                false,
                                reasons,
                                actor,
                                zone,
                                Vec::new(),
                                Decimal::ZERO,
                            );
                        }
                        // The withdrawal stands as a cost of attempting.
                        self.cooldowns.mark(actor, zone);
                        return Decision::deny_charged(reasons, eco.cost);
                    }
                    return self.finalize(true, reasons, actor, zone, plan, eco.cost);
                }
                self.finalize(pass_non_economy, reasons, actor, zone, plan, Decimal::ZERO)
            }
            ChargeTiming::OnPass => {
                if !pass_non_economy {
                    return self.finalize(false, reasons, actor, zone, Vec::new(), Decimal::ZERO);
                }
                let balance = self.economy.balance(actor).await;
                debug!(%balance, min = %eco.min_balance, cost = %eco.cost, "economy (on-pass)");
                if eco.min_balance > Decimal::ZERO && balance < eco.min_balance {
                    reasons.push(DenyReason::Economy);
                    return self.finalize(false, reasons, actor, zone, Vec::new(), Decimal::ZERO);
                }
                if eco.cost > Decimal::ZERO {
                    let ok = self.economy.withdraw(actor, eco.cost).await;
                    debug!(ok, cost = %eco.cost, "withdraw (on-pass)");
                    if !ok {
                        reasons.push(DenyReason::Economy);
                        return self.finalize(
                            false,
                            reasons,
                            actor,
                            zone,
                            Vec::new(),
                            Decimal::ZERO,
                        );
                    }
                    return self.finalize(true, reasons, actor, zone, plan, eco.cost);
                }
                self.finalize(true, reasons, actor, zone, plan, Decimal::ZERO)
            }
        }
    }

    /// Dry-run evaluation with a per-rule verdict breakdown.
    ///
    /// Same side-effect profile as [`evaluate`](Self::evaluate): a denial
    /// still records its cooldown mark.
    pub async fn probe(&self, actor: &ActorId, zone: &ZoneId) -> ProbeReport {
        let eff = self.effective(zone);
        let decision = self.evaluate(actor, zone).await;
        let verdicts = vec![
            (
                "bypass",
                rule_verdict(eff.rules.bypass.enabled, &decision, DenyReason::Bypass),
            ),
            (
                "permission",
                rule_verdict(
                    eff.rules.permission.enabled,
                    &decision,
                    DenyReason::Permission,
                ),
            ),
            (
                "items",
                rule_verdict(eff.rules.items.enabled, &decision, DenyReason::Items),
            ),
            (
                "attribute",
                rule_verdict(
                    eff.rules.attributes.enabled,
                    &decision,
                    DenyReason::Attribute,
                ),
            ),
            (
                "economy",
                rule_verdict(eff.rules.economy.enabled, &decision, DenyReason::Economy),
            ),
        ];
        ProbeReport {
            zone: zone.clone(),
            restricted: eff.restricted,
            rule_logic: eff.rule_logic,
            decision,
            verdicts,
        }
    }

    /// Info-level dump of each zone's effective rules, for startup reporting.
    pub fn log_effective_rules(&self, zones: &[ZoneId]) {
        let config = self.config();
        for zone in zones {
            let eff = config.effective(zone);
            info!(
                zone = %zone,
                restricted = eff.restricted,
                logic = ?eff.rule_logic,
                bypass = eff.rules.bypass.enabled,
                permission = eff.rules.permission.enabled,
                items = eff.rules.items.enabled,
                attributes = eff.rules.attributes.enabled,
                economy = eff.rules.economy.enabled,
                "effective zone rules"
            );
        }
    }

    fn finalize(
        &self,
        allow: bool,
        reasons: Vec<DenyReason>,
        actor: &ActorId,
        zone: &ZoneId,
        plan: Vec<SlotDraw>,
        charged: Decimal,
    ) -> Decision {
        debug!(allow, %charged, draws = plan.len(), zone = %zone, "finalizing decision");
        if !allow {
            self.cooldowns.mark(actor, zone);
            return Decision::deny(reasons);
        }
        Decision::allow(charged, plan)
    }

    fn attributes_pass(&self, actor: &ActorId, rule: &AttributeRule) -> bool {
        let Some(provider) = &self.attributes else {
            debug!("attribute service unavailable, rule fails");
            return false;
        };
        let mut all = true;
        for check in &rule.checks {
            let value = provider.expand(actor, &check.expression);
            let ok = value
                .as_deref()
                .is_some_and(|v| attribute_check_passes(v, check));
            debug!(
                expression = %check.expression,
                value = ?value,
                op = ?check.op,
                expect = %check.value,
                ok,
                "attribute check"
            );
            if !ok {
                all = false;
            }
        }
        rule.checks.is_empty() || all
    }
}

/// Outcome of one rule inside a [`ProbeReport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleVerdict {
    /// Rule is disabled for the zone.
    NotApplicable,
    Passed,
    Failed,
}

/// Dry-run report: the effective summary, the decision, and per-rule verdicts.
#[derive(Clone, Debug)]
pub struct ProbeReport {
    pub zone: ZoneId,
    pub restricted: bool,
    pub rule_logic: RuleLogic,
    pub decision: Decision,
    pub verdicts: Vec<(&'static str, RuleVerdict)>,
}

fn rule_verdict(enabled: bool, decision: &Decision, reason: DenyReason) -> RuleVerdict {
    if !enabled {
        RuleVerdict::NotApplicable
    } else if decision.reasons.contains(&reason) {
        RuleVerdict::Failed
    } else {
        RuleVerdict::Passed
    }
}

/// First fully matching set wins; `None` when no set matches.
/// An empty `any_of` passes vacuously with an empty plan.
fn match_any_of(holdings: &[Option<Holding>], sets: &[ResourceSet]) -> Option<Vec<SlotDraw>> {
    if sets.is_empty() {
        return Some(Vec::new());
    }
    sets.iter().find_map(|set| match_set(holdings, set))
}

/// Greedy slot scan per requirement; any unsatisfied quantity fails the set.
fn match_set(holdings: &[Option<Holding>], set: &ResourceSet) -> Option<Vec<SlotDraw>> {
    let mut draws = Vec::new();
    for req in &set.required {
        let mut needed = req.amount;
        for (slot, holding) in holdings.iter().enumerate() {
            if needed == 0 {
                break;
            }
            let Some(h) = holding else { continue };
            if h.kind != req.kind || !tags_match(h, &req.tag_checks) {
                continue;
            }
            let take = needed.min(h.amount);
            draws.push(SlotDraw { slot, amount: take });
            needed -= take;
        }
        if needed > 0 {
            return None;
        }
    }
    Some(draws)
}

/// Exact, type-driven tag comparison; any missing or mismatched tag fails.
fn tags_match(holding: &Holding, checks: &[TagCheck]) -> bool {
    checks.iter().all(|c| {
        match (holding.tags.get(&c.key), c.kind) {
            (Some(TagValue::Str(v)), TagKind::String) => *v == c.value,
            (Some(TagValue::Int(v)), TagKind::Int) => {
                c.value.trim().parse::<i32>().is_ok_and(|want| *v == want)
            }
            (Some(TagValue::Long(v)), TagKind::Long) => {
                c.value.trim().parse::<i64>().is_ok_and(|want| *v == want)
            }
            (Some(TagValue::Double(v)), TagKind::Double) => c
                .value
                .trim()
                .parse::<f64>()
                .is_ok_and(|want| (v - want).abs() <= 1e-9),
            _ => false,
        }
    })
}

/// A comparator error (non-numeric input, bad pattern) counts as failure.
fn attribute_check_passes(value: &str, check: &AttributeCheck) -> bool {
    match check.op {
        AttributeOp::Equals => value == check.value,
        AttributeOp::NotEquals => value != check.value,
        AttributeOp::Contains => value.contains(&check.value),
        // Entire-value match, not substring search.
        AttributeOp::MatchesRegex => Regex::new(&format!("^(?:{})$", check.value))
            .is_ok_and(|re| re.is_match(value)),
        AttributeOp::NumberGte => match (parse_decimal(value), parse_decimal(&check.value)) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        },
        AttributeOp::NumberLte => match (parse_decimal(value), parse_decimal(&check.value)) {
            (Some(a), Some(b)) => a <= b,
            _ => false,
        },
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    s.trim().parse().ok()
}
