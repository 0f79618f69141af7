//! Gate index: the hot-path cache from zone to restriction summary.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::debug;

use wardgate_types::{GateConfig, ZoneId};

/// Restriction summary for one zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateSummary {
    pub restricted: bool,
    /// The zone's resource rule consumes the matched plan on pass.
    pub consume_on_pass: bool,
}

/// Zone → [`GateSummary`] cache, rebuilt wholesale whenever configuration or
/// the set of known zones changes.
///
/// Readers clone the inner `Arc` and never block the rebuild; a stale read
/// during the brief swap window merely re-runs one full evaluation.
#[derive(Debug, Default)]
pub struct GateIndex {
    inner: RwLock<Arc<HashMap<ZoneId, GateSummary>>>,
}

impl GateIndex {
    /// An empty index; every zone reads as unknown until the first rebuild.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the union of the host's known zones and every configured
    /// zone, then swap the fresh map in.
    pub fn rebuild(&self, config: &GateConfig, known_zones: impl IntoIterator<Item = ZoneId>) {
        let mut zones: HashSet<ZoneId> = known_zones.into_iter().collect();
        zones.extend(config.zones.keys().cloned());

        let mut map = HashMap::with_capacity(zones.len());
        for zone in zones {
            let eff = config.effective(&zone);
            debug!(
                zone = %zone,
                restricted = eff.restricted,
                consume_on_pass = eff.rules.items.consume_on_pass,
                "gate index entry"
            );
            map.insert(
                zone,
                GateSummary {
                    restricted: eff.restricted,
                    consume_on_pass: eff.rules.items.consume_on_pass,
                },
            );
        }

        *self.inner.write().unwrap() = Arc::new(map);
    }

    /// Summary for a zone; `None` when the zone is unknown to the index.
    pub fn summary(&self, zone: &ZoneId) -> Option<GateSummary> {
        self.inner.read().unwrap().get(zone).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardgate_types::{ResourceRule, RuleSet, ZoneOverride};

    fn config_with_restricted(zone: &str, consume: bool) -> GateConfig {
        let mut config = GateConfig {
            rules: RuleSet {
                items: ResourceRule {
                    enabled: true,
                    consume_on_pass: consume,
                    any_of: vec![],
                },
                ..RuleSet::default()
            },
            ..GateConfig::default()
        };
        config
            .zones
            .insert(ZoneId::new(zone), ZoneOverride::default());
        config
    }

    #[test]
    fn rebuild_covers_host_and_configured_zones() {
        let index = GateIndex::new();
        let config = config_with_restricted("sanctum", true);

        index.rebuild(&config, vec![ZoneId::new("meadow")]);

        let sanctum = index.summary(&ZoneId::new("sanctum")).unwrap();
        assert!(sanctum.restricted);
        assert!(sanctum.consume_on_pass);

        // Known to the host but unlisted: present, unrestricted.
        let meadow = index.summary(&ZoneId::new("meadow")).unwrap();
        assert!(!meadow.restricted);

        assert!(index.summary(&ZoneId::new("elsewhere")).is_none());
    }

    #[test]
    fn rebuild_replaces_previous_entries() {
        let index = GateIndex::new();
        index.rebuild(&config_with_restricted("sanctum", false), vec![]);
        assert!(index.summary(&ZoneId::new("sanctum")).is_some());

        index.rebuild(&config_with_restricted("vault", false), vec![]);
        assert!(index.summary(&ZoneId::new("sanctum")).is_none());
        assert!(index.summary(&ZoneId::new("vault")).is_some());
    }

    #[test]
    fn empty_index_knows_nothing() {
        let index = GateIndex::new();
        assert!(index.summary(&ZoneId::new("sanctum")).is_none());
    }
}
