//! Gate rules and their per-zone override semantics.
//!
//! A zone's effective rule set is the global rule set with the zone's override
//! applied field by field. Scalar fields from an override always replace the
//! base value; list fields replace the base wholesale only when the override
//! list is non-empty, so an override that omits a list keeps the global one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::ResourceKind;

/// How the enabled non-economy rules combine into one verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLogic {
    /// At least one enabled rule must pass (vacuously passes with none enabled).
    Any,
    /// Every enabled rule must pass.
    All,
}

impl RuleLogic {
    /// Parse a configured value; `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Some(Self::Any),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Which zones are restricted by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionMode {
    /// Only zones with a configured entry are restricted.
    Listed,
    /// Every zone is restricted unless its entry opts out.
    AllExceptListed,
}

impl RestrictionMode {
    /// Parse a configured value; `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listed" => Some(Self::Listed),
            "all_except_listed" => Some(Self::AllExceptListed),
            _ => None,
        }
    }
}

/// When the economy rule charges the actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChargeTiming {
    /// Never contact the economy.
    None,
    /// Charge before the other rules are honored; a failed charge denies.
    OnAttempt,
    /// Charge only once the other rules have passed.
    OnPass,
}

impl ChargeTiming {
    /// Parse a configured value; `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "on-attempt" | "onattempt" => Some(Self::OnAttempt),
            "on-pass" | "onpass" => Some(Self::OnPass),
            _ => None,
        }
    }
}

/// Passes when the actor holds the bypass flag or the configured node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BypassRule {
    pub enabled: bool,
    /// Permission node that grants bypass without the registry flag.
    pub permission_node: String,
}

impl Default for BypassRule {
    fn default() -> Self {
        Self {
            enabled: false,
            permission_node: "wardgate.bypass".to_string(),
        }
    }
}

impl BypassRule {
    fn apply_override(&mut self, o: &BypassRule) {
        self.enabled = o.enabled;
        if !o.permission_node.is_empty() {
            self.permission_node = o.permission_node.clone();
        }
    }
}

/// Passes when the actor holds the access node, optionally suffixed per zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub enabled: bool,
    /// Append `.<zone>` to the custom node before checking.
    pub per_zone_node: bool,
    pub custom_node: String,
}

impl Default for PermissionRule {
    fn default() -> Self {
        Self {
            enabled: false,
            per_zone_node: true,
            custom_node: "wardgate.access".to_string(),
        }
    }
}

impl PermissionRule {
    fn apply_override(&mut self, o: &PermissionRule) {
        self.enabled = o.enabled;
        self.per_zone_node = o.per_zone_node;
        if !o.custom_node.is_empty() {
            self.custom_node = o.custom_node.clone();
        }
    }
}

/// Type of a stored tag value a [`TagCheck`] compares against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    String,
    Int,
    Long,
    Double,
}

impl TagKind {
    /// Parse a configured value; `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "double" => Some(Self::Double),
            _ => None,
        }
    }
}

/// Exact, type-driven comparison against one tag on a held resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagCheck {
    pub key: String,
    pub kind: TagKind,
    pub value: String,
}

/// One required resource: a kind, a quantity, and optional tag checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    pub kind: ResourceKind,
    /// Quantity required, at least 1.
    pub amount: u32,
    pub tag_checks: Vec<TagCheck>,
}

/// A set of requirements that must all be satisfiable at once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSet {
    pub required: Vec<ResourceRequirement>,
}

/// Passes when any one [`ResourceSet`] fully matches the actor's holdings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRule {
    pub enabled: bool,
    /// Execute the matched consumption plan when the move is allowed.
    pub consume_on_pass: bool,
    /// Alternative requirement sets; first full match wins.
    pub any_of: Vec<ResourceSet>,
}

impl ResourceRule {
    fn apply_override(&mut self, o: &ResourceRule) {
        self.enabled = o.enabled;
        self.consume_on_pass = o.consume_on_pass;
        // A non-empty override list replaces wholesale; an empty one keeps the base.
        if !o.any_of.is_empty() {
            self.any_of = o.any_of.clone();
        }
    }
}

/// Comparison operator for one attribute check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeOp {
    Equals,
    NotEquals,
    Contains,
    MatchesRegex,
    NumberGte,
    NumberLte,
}

impl AttributeOp {
    /// Parse a configured value; `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" => Some(Self::Equals),
            "not_equals" => Some(Self::NotEquals),
            "contains" => Some(Self::Contains),
            "matches_regex" => Some(Self::MatchesRegex),
            "number_gte" => Some(Self::NumberGte),
            "number_lte" => Some(Self::NumberLte),
            _ => None,
        }
    }
}

/// One expression expanded by the attribute service and compared to a value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeCheck {
    pub expression: String,
    pub op: AttributeOp,
    pub value: String,
}

/// Passes when every configured check passes against the attribute service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeRule {
    pub enabled: bool,
    pub checks: Vec<AttributeCheck>,
}

impl AttributeRule {
    fn apply_override(&mut self, o: &AttributeRule) {
        self.enabled = o.enabled;
        if !o.checks.is_empty() {
            self.checks = o.checks.clone();
        }
    }
}

/// Balance floor and entry cost, charged per [`ChargeTiming`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomyRule {
    pub enabled: bool,
    pub timing: ChargeTiming,
    /// Minimum balance required before any charge is considered.
    pub min_balance: Decimal,
    pub cost: Decimal,
    /// Return a successful withdrawal when the other rules deny.
    pub refund_on_deny: bool,
}

impl Default for EconomyRule {
    fn default() -> Self {
        Self {
            enabled: false,
            timing: ChargeTiming::OnPass,
            min_balance: Decimal::ZERO,
            cost: Decimal::ZERO,
            refund_on_deny: true,
        }
    }
}

impl EconomyRule {
    fn apply_override(&mut self, o: &EconomyRule) {
        self.enabled = o.enabled;
        self.timing = o.timing;
        self.min_balance = o.min_balance;
        self.cost = o.cost;
        self.refund_on_deny = o.refund_on_deny;
    }
}

/// The five gate rules as configured for one scope (global or per zone).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub bypass: BypassRule,
    pub permission: PermissionRule,
    pub items: ResourceRule,
    pub attributes: AttributeRule,
    pub economy: EconomyRule,
}

impl RuleSet {
    /// Apply a per-zone override on top of this (global) rule set.
    pub fn apply_override(&mut self, o: &RuleSet) {
        self.bypass.apply_override(&o.bypass);
        self.permission.apply_override(&o.permission);
        self.items.apply_override(&o.items);
        self.attributes.apply_override(&o.attributes);
        self.economy.apply_override(&o.economy);
    }

    /// Whether any non-economy rule is enabled.
    pub fn any_non_economy_enabled(&self) -> bool {
        self.bypass.enabled
            || self.permission.enabled
            || self.items.enabled
            || self.attributes.enabled
    }
}

/// The merged view governing one zone, as returned by
/// [`GateConfig::effective`](crate::config::GateConfig::effective).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRuleSet {
    pub restricted: bool,
    /// Suppression window after a denial; 0 disables the cooldown.
    pub deny_cooldown_secs: u32,
    pub rule_logic: RuleLogic,
    pub rules: RuleSet,
}
