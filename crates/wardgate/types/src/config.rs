//! The loaded configuration snapshot and its per-zone effective view.
//!
//! A [`GateConfig`] is immutable once built; a reload produces a fresh
//! snapshot that owners swap in wholesale (typically behind an `Arc`), so
//! [`GateConfig::effective`] can be called concurrently without locking.
//!
//! Loading is lenient: unrecognized enum values, negative amounts, and
//! malformed entries are normalized to safe defaults with a warning, so the
//! engine downstream never has to validate primitives.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;
use crate::ids::{ResourceKind, ZoneId};
use crate::rules::{
    AttributeCheck, AttributeOp, AttributeRule, BypassRule, ChargeTiming, EconomyRule,
    EffectiveRuleSet, PermissionRule, ResourceRequirement, ResourceRule, ResourceSet,
    RestrictionMode, RuleLogic, RuleSet, TagCheck, TagKind,
};

/// Top-level gate behavior shared by every zone.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneralConfig {
    pub restriction_mode: RestrictionMode,
    pub rule_logic: RuleLogic,
    /// Persist the bypass registry across restarts.
    pub remember_bypass: bool,
    /// Deliver per-reason explanation lines on denials.
    pub show_deny_reasons: bool,
    pub deny_cooldown_secs: u32,
    /// Preferred economy backend name, `auto` to probe.
    pub economy_backend: String,
    /// Zone actors are relocated to when a backdoor re-check denies.
    pub fallback_zone: ZoneId,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            restriction_mode: RestrictionMode::Listed,
            rule_logic: RuleLogic::Any,
            remember_bypass: true,
            show_deny_reasons: true,
            deny_cooldown_secs: 2,
            economy_backend: "auto".to_string(),
            fallback_zone: ZoneId::new("hub"),
        }
    }
}

/// Per-zone overrides; absent fields fall through to the global configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ZoneOverride {
    pub restricted: Option<bool>,
    pub deny_cooldown_secs: Option<u32>,
    pub rule_logic: Option<RuleLogic>,
    pub rules: Option<RuleSet>,
}

/// User-facing message templates and zone display aliases.
///
/// Templates substitute `{zone}` and `{amount}`; an empty template disables
/// the corresponding notice.
#[derive(Clone, Debug, PartialEq)]
pub struct MessagesConfig {
    pub prefix: String,
    pub denied: String,
    pub charged: String,
    pub forced_out: String,
    /// Extra hint delivered when a natural portal attempt is denied.
    pub portal_hint: String,
    /// Explanation line per deny-reason key; missing keys print nothing.
    pub reason_lines: HashMap<String, String>,
    /// Display alias per zone name.
    pub aliases: HashMap<String, String>,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            denied: "You are not allowed to enter {zone}.".to_string(),
            charged: "Entry fee: {amount}.".to_string(),
            forced_out: "You were moved to a safe area.".to_string(),
            portal_hint: String::new(),
            reason_lines: HashMap::new(),
            aliases: HashMap::new(),
        }
    }
}

impl MessagesConfig {
    /// Display alias for a zone, falling back to its raw name.
    pub fn alias_for<'a>(&'a self, zone: &'a ZoneId) -> &'a str {
        self.aliases
            .get(zone.as_str())
            .map(String::as_str)
            .unwrap_or(zone.as_str())
    }
}

/// The resolved, typed configuration snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GateConfig {
    pub general: GeneralConfig,
    /// Global rule set every zone starts from.
    pub rules: RuleSet,
    pub zones: HashMap<ZoneId, ZoneOverride>,
    pub messages: MessagesConfig,
}

impl GateConfig {
    /// Compute the merged rule set governing `zone`.
    ///
    /// Pure and side-effect free; unknown zones fall back to the global rules
    /// plus the restriction-mode default.
    pub fn effective(&self, zone: &ZoneId) -> EffectiveRuleSet {
        let ov = self.zones.get(zone);
        let restricted = match self.general.restriction_mode {
            RestrictionMode::Listed => ov.is_some_and(|o| o.restricted.unwrap_or(true)),
            RestrictionMode::AllExceptListed => ov.map_or(true, |o| o.restricted.unwrap_or(true)),
        };

        let mut rules = self.rules.clone();
        let mut cooldown = self.general.deny_cooldown_secs;
        let mut logic = self.general.rule_logic;

        if let Some(ov) = ov {
            if let Some(cd) = ov.deny_cooldown_secs {
                cooldown = cd;
            }
            if let Some(l) = ov.rule_logic {
                logic = l;
            }
            if let Some(r) = &ov.rules {
                rules.apply_override(r);
            }
        }

        EffectiveRuleSet {
            restricted,
            deny_cooldown_secs: cooldown,
            rule_logic: logic,
            rules,
        }
    }

    /// Parse and normalize a TOML configuration document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(input)?;
        Ok(normalize(raw))
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}

/* ---------------- raw (serde) layer ---------------- */

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawConfig {
    general: RawGeneral,
    rules: Option<RawRules>,
    zones: HashMap<String, RawZone>,
    messages: RawMessages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawGeneral {
    restricted_mode: Option<String>,
    rule_logic: Option<String>,
    remember_bypass: Option<bool>,
    show_deny_reasons: Option<bool>,
    deny_cooldown_seconds: Option<i64>,
    economy_backend: Option<String>,
    fallback_zone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawRules {
    bypass: Option<RawBypass>,
    permission: Option<RawPermission>,
    items: Option<RawItems>,
    attributes: Option<RawAttributes>,
    economy: Option<RawEconomy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawBypass {
    enabled: Option<bool>,
    permission: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawPermission {
    enabled: Option<bool>,
    per_zone_node: Option<bool>,
    custom_node: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawItems {
    enabled: Option<bool>,
    consume_on_pass: Option<bool>,
    any_of: Vec<RawResourceSet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawResourceSet {
    #[serde(rename = "match")]
    required: Vec<RawRequirement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawRequirement {
    kind: Option<String>,
    amount: Option<i64>,
    tags: Vec<RawTagCheck>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawTagCheck {
    key: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawAttributes {
    enabled: Option<bool>,
    checks: Vec<RawAttributeCheck>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawAttributeCheck {
    expression: Option<String>,
    #[serde(rename = "type")]
    op: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawEconomy {
    enabled: Option<bool>,
    charge_timing: Option<String>,
    min_balance: Option<f64>,
    cost: Option<f64>,
    refund_on_deny: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawZone {
    restricted: Option<bool>,
    deny_cooldown_seconds: Option<i64>,
    rule_logic: Option<String>,
    rules: Option<RawRules>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawMessages {
    prefix: Option<String>,
    denied: Option<String>,
    charged: Option<String>,
    forced_out: Option<String>,
    portal_hint: Option<String>,
    reason: HashMap<String, String>,
    aliases: HashMap<String, String>,
}

/* ---------------- normalization ---------------- */

fn normalize(raw: RawConfig) -> GateConfig {
    let defaults = GeneralConfig::default();
    let g = raw.general;

    let restriction_mode = parse_or(
        g.restricted_mode.as_deref(),
        RestrictionMode::parse,
        defaults.restriction_mode,
        "general.restricted-mode",
    );
    let rule_logic = parse_or(
        g.rule_logic.as_deref(),
        RuleLogic::parse,
        defaults.rule_logic,
        "general.rule-logic",
    );

    let general = GeneralConfig {
        restriction_mode,
        rule_logic,
        remember_bypass: g.remember_bypass.unwrap_or(defaults.remember_bypass),
        show_deny_reasons: g.show_deny_reasons.unwrap_or(defaults.show_deny_reasons),
        deny_cooldown_secs: clamp_secs(
            g.deny_cooldown_seconds,
            defaults.deny_cooldown_secs,
        ),
        economy_backend: g.economy_backend.unwrap_or(defaults.economy_backend),
        fallback_zone: g
            .fallback_zone
            .map(ZoneId::new)
            .unwrap_or(defaults.fallback_zone),
    };

    let rules = normalize_rules(raw.rules.as_ref());

    let zones = raw
        .zones
        .into_iter()
        .map(|(name, z)| {
            let ov = ZoneOverride {
                restricted: z.restricted,
                deny_cooldown_secs: z.deny_cooldown_seconds.map(|s| clamp_secs(Some(s), 0)),
                rule_logic: z.rule_logic.as_deref().map(|s| {
                    parse_or(Some(s), RuleLogic::parse, rule_logic, "zone rule-logic")
                }),
                rules: z.rules.as_ref().map(|r| normalize_rules(Some(r))),
            };
            (ZoneId::new(name), ov)
        })
        .collect();

    let m = raw.messages;
    let message_defaults = MessagesConfig::default();
    let messages = MessagesConfig {
        prefix: m.prefix.unwrap_or(message_defaults.prefix),
        denied: m.denied.unwrap_or(message_defaults.denied),
        charged: m.charged.unwrap_or(message_defaults.charged),
        forced_out: m.forced_out.unwrap_or(message_defaults.forced_out),
        portal_hint: m.portal_hint.unwrap_or(message_defaults.portal_hint),
        reason_lines: m
            .reason
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect(),
        aliases: m.aliases,
    };

    GateConfig {
        general,
        rules,
        zones,
        messages,
    }
}

fn normalize_rules(raw: Option<&RawRules>) -> RuleSet {
    let mut out = RuleSet::default();
    let Some(raw) = raw else {
        return out;
    };

    if let Some(b) = &raw.bypass {
        out.bypass = BypassRule {
            enabled: b.enabled.unwrap_or(true),
            permission_node: b
                .permission
                .clone()
                .unwrap_or_else(|| BypassRule::default().permission_node),
        };
    }

    if let Some(p) = &raw.permission {
        out.permission = PermissionRule {
            enabled: p.enabled.unwrap_or(true),
            per_zone_node: p.per_zone_node.unwrap_or(true),
            custom_node: p
                .custom_node
                .clone()
                .unwrap_or_else(|| PermissionRule::default().custom_node),
        };
    }

    if let Some(i) = &raw.items {
        out.items = ResourceRule {
            enabled: i.enabled.unwrap_or(false),
            consume_on_pass: i.consume_on_pass.unwrap_or(false),
            any_of: i.any_of.iter().filter_map(normalize_resource_set).collect(),
        };
    }

    if let Some(a) = &raw.attributes {
        out.attributes = AttributeRule {
            enabled: a.enabled.unwrap_or(false),
            checks: a.checks.iter().map(normalize_attribute_check).collect(),
        };
    }

    if let Some(e) = &raw.economy {
        out.economy = EconomyRule {
            enabled: e.enabled.unwrap_or(false),
            timing: parse_or(
                e.charge_timing.as_deref(),
                ChargeTiming::parse,
                ChargeTiming::OnPass,
                "economy.charge-timing",
            ),
            min_balance: clamp_amount(e.min_balance),
            cost: clamp_amount(e.cost),
            refund_on_deny: e.refund_on_deny.unwrap_or(true),
        };
    }

    out
}

fn normalize_resource_set(raw: &RawResourceSet) -> Option<ResourceSet> {
    let required: Vec<ResourceRequirement> = raw
        .required
        .iter()
        .filter_map(|r| {
            let kind = r.kind.as_deref().unwrap_or("");
            if kind.is_empty() {
                warn!("resource requirement without a kind, skipped");
                return None;
            }
            Some(ResourceRequirement {
                kind: ResourceKind::new(kind),
                amount: r.amount.unwrap_or(1).max(1) as u32,
                tag_checks: r.tags.iter().map(normalize_tag_check).collect(),
            })
        })
        .collect();

    if required.is_empty() {
        None
    } else {
        Some(ResourceSet { required })
    }
}

fn normalize_tag_check(raw: &RawTagCheck) -> TagCheck {
    TagCheck {
        key: raw.key.clone().unwrap_or_default(),
        kind: parse_or(
            raw.kind.as_deref(),
            TagKind::parse,
            TagKind::String,
            "tag check type",
        ),
        value: raw.value.clone().unwrap_or_default(),
    }
}

fn normalize_attribute_check(raw: &RawAttributeCheck) -> AttributeCheck {
    AttributeCheck {
        expression: raw.expression.clone().unwrap_or_default(),
        op: parse_or(
            raw.op.as_deref(),
            AttributeOp::parse,
            AttributeOp::Equals,
            "attribute check type",
        ),
        value: raw.value.clone().unwrap_or_default(),
    }
}

fn parse_or<T: Copy>(
    raw: Option<&str>,
    parse: fn(&str) -> Option<T>,
    default: T,
    what: &str,
) -> T {
    match raw {
        None => default,
        Some(s) => parse(s).unwrap_or_else(|| {
            warn!(value = s, "unrecognized {what}, using default");
            default
        }),
    }
}

fn clamp_secs(raw: Option<i64>, default: u32) -> u32 {
    match raw {
        None => default,
        Some(s) => s.clamp(0, u32::MAX as i64) as u32,
    }
}

fn clamp_amount(raw: Option<f64>) -> Decimal {
    let v = raw.unwrap_or(0.0);
    if !v.is_finite() || v <= 0.0 {
        return Decimal::ZERO;
    }
    Decimal::try_from(v).unwrap_or_else(|_| {
        warn!(value = v, "amount not representable, using zero");
        Decimal::ZERO
    })
}
