//! User-facing notice rendering from the configured message catalog.

use std::collections::HashMap;

use rust_decimal::Decimal;

use wardgate_types::{DenyReason, GateConfig, ZoneId};

/// Immutable snapshot of the message templates and display aliases, built
/// from a configuration snapshot and swapped wholesale on reload.
#[derive(Clone, Debug)]
pub struct MessageCatalog {
    prefix: String,
    denied: String,
    charged: String,
    forced_out: String,
    portal_hint: String,
    show_deny_reasons: bool,
    fallback_zone: ZoneId,
    reason_lines: HashMap<String, String>,
    aliases: HashMap<String, String>,
}

impl MessageCatalog {
    /// Snapshot the message-relevant parts of a configuration.
    pub fn from_config(config: &GateConfig) -> Self {
        let m = &config.messages;
        Self {
            prefix: m.prefix.clone(),
            denied: m.denied.clone(),
            charged: m.charged.clone(),
            forced_out: m.forced_out.clone(),
            portal_hint: m.portal_hint.clone(),
            show_deny_reasons: config.general.show_deny_reasons,
            fallback_zone: config.general.fallback_zone.clone(),
            reason_lines: m.reason_lines.clone(),
            aliases: m.aliases.clone(),
        }
    }

    /// Zone actors get relocated to when a backdoor re-check denies.
    pub fn fallback_zone(&self) -> &ZoneId {
        &self.fallback_zone
    }

    /// Display alias for a zone, falling back to its raw name.
    pub fn alias_for<'a>(&'a self, zone: &'a ZoneId) -> &'a str {
        self.aliases
            .get(zone.as_str())
            .map(String::as_str)
            .unwrap_or(zone.as_str())
    }

    /// The denial notice for a zone.
    pub fn denied_line(&self, zone: &ZoneId) -> String {
        let body = render(&self.denied, &[("zone", self.alias_for(zone))]);
        format!("{}{}", self.prefix, body)
    }

    /// The charged notice; `None` when the template is empty.
    pub fn charged_line(&self, amount: &Decimal) -> Option<String> {
        if self.charged.is_empty() {
            return None;
        }
        let body = render(&self.charged, &[("amount", &amount.to_string())]);
        Some(format!("{}{}", self.prefix, body))
    }

    /// The forced-out notice; `None` when the template is empty.
    pub fn forced_out_line(&self) -> Option<String> {
        if self.forced_out.is_empty() {
            return None;
        }
        Some(format!("{}{}", self.prefix, self.forced_out))
    }

    /// The portal hint; `None` when the template is empty.
    pub fn portal_hint_line(&self) -> Option<String> {
        if self.portal_hint.is_empty() {
            return None;
        }
        Some(format!("{}{}", self.prefix, self.portal_hint))
    }

    /// Explanation line for one deny reason; `None` when explanations are
    /// disabled or no line is configured for the reason.
    pub fn reason_line(&self, reason: DenyReason) -> Option<String> {
        if !self.show_deny_reasons {
            return None;
        }
        self.reason_lines
            .get(reason.key())
            .map(|line| format!("{}{}", self.prefix, line))
    }
}

/// Substitute `{key}` markers in a template.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardgate_types::{GeneralConfig, MessagesConfig};

    fn catalog() -> MessageCatalog {
        let mut messages = MessagesConfig::default();
        messages.prefix = "[gate] ".into();
        messages
            .reason_lines
            .insert("items".into(), "You are missing required items.".into());
        messages
            .aliases
            .insert("sanctum".into(), "The Inner Sanctum".into());
        MessageCatalog::from_config(&GateConfig {
            messages,
            ..GateConfig::default()
        })
    }

    #[test]
    fn render_substitutes_markers() {
        assert_eq!(
            render("Entry fee: {amount}.", &[("amount", "5")]),
            "Entry fee: 5."
        );
        assert_eq!(render("no markers", &[("zone", "x")]), "no markers");
    }

    #[test]
    fn denied_line_uses_the_alias_and_prefix() {
        let line = catalog().denied_line(&ZoneId::new("sanctum"));
        assert_eq!(line, "[gate] You are not allowed to enter The Inner Sanctum.");
    }

    #[test]
    fn unaliased_zone_renders_raw_name() {
        let line = catalog().denied_line(&ZoneId::new("meadow"));
        assert!(line.contains("meadow"));
    }

    #[test]
    fn reason_lines_honor_the_visibility_flag() {
        let with_reasons = catalog();
        assert!(with_reasons.reason_line(DenyReason::Items).is_some());
        assert!(with_reasons.reason_line(DenyReason::Economy).is_none());

        let hidden = MessageCatalog::from_config(&GateConfig {
            general: GeneralConfig {
                show_deny_reasons: false,
                ..GeneralConfig::default()
            },
            ..GateConfig::default()
        });
        assert!(hidden.reason_line(DenyReason::Items).is_none());
    }

    #[test]
    fn empty_templates_disable_their_notices() {
        let mut messages = MessagesConfig::default();
        messages.charged = String::new();
        let catalog = MessageCatalog::from_config(&GateConfig {
            messages,
            ..GateConfig::default()
        });
        assert!(catalog.charged_line(&Decimal::from(5)).is_none());
        assert!(catalog.portal_hint_line().is_none());
    }

    #[test]
    fn charged_line_formats_the_amount() {
        let line = catalog().charged_line(&Decimal::from(5)).unwrap();
        assert_eq!(line, "[gate] Entry fee: 5.");
    }
}
