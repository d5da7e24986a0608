//! Rule lookup index.
//!
//! Precomputed from every Select across every rule's firing and clearing
//! lists, the index narrows an incoming event to the rule groups that could
//! possibly match it, turning O(all rules) matching into O(candidates).
//!
//! Shape, for a config like:
//!
//! ```yaml
//! epc:
//!   alerts:
//!   - firing:
//!       select:
//!       - oid: .1.3.6.1.6.3.1.1.4.1
//!         as: value
//!         values: [.1.3.6.1.4.1.8164.2.13, .1.3.6.1.4.1.8164.2.4]
//! nso:
//!   alerts:
//!   - firing:
//!       select:
//!       - oid: .1.3.6.1.6.3.1.1.4.1
//!         as: value
//!         values: [.1.3.6.1.4.1.8164.2.13]
//! ```
//!
//! the index is:
//!
//! ```text
//! ".1.3.6.1.6.3.1.1.4.1" ->
//!     value ->
//!         ".1.3.6.1.4.1.8164.2.13" -> {"epc", "nso"}
//!         ".1.3.6.1.4.1.8164.2.4"  -> {"epc"}
//! ```

use crate::rules::{RuleGroupSet, Select};
use crate::value::{ResolveAs, ValueResolver};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

type ValueMap = HashMap<String, HashSet<String>>;
type ModeMap = HashMap<ResolveAs, ValueMap>;

/// Maps (OID, resolution mode, literal value) to the rule-group names
/// referencing that triple in any Select.
#[derive(Debug, Default)]
pub struct LookupIndex {
    index: HashMap<String, ModeMap>,
}

impl LookupIndex {
    /// Build the index from a loaded rule set.
    pub fn build(groups: &RuleGroupSet) -> Self {
        let mut lookup = Self::default();
        for (group_name, group) in groups {
            for rule in &group.alerts {
                lookup.add_selects(group_name, &rule.firing.select);
                lookup.add_selects(group_name, &rule.clearing.select);
            }
        }
        trace!(oids = lookup.index.len(), "Built rule lookup index");
        lookup
    }

    fn add_selects(&mut self, group_name: &str, selects: &[Select]) {
        for select in selects {
            let mode_map = self.index.entry(select.oid.clone()).or_default();
            let value_map = mode_map.entry(select.resolve_as).or_default();
            for value in &select.values {
                value_map.entry(value.clone()).or_default().insert(group_name.to_string());
                trace!(
                    oid = %select.oid,
                    mode = %select.resolve_as,
                    value = %value,
                    group = %group_name,
                    "Added to lookup index"
                );
            }
        }
    }

    /// Find the rule groups applicable to one event.
    ///
    /// For each indexed OID and each mode registered under it, the event's
    /// value is resolved under that mode; resolution failures are skipped,
    /// not propagated. Matching group names are returned deduplicated in
    /// first-seen order. An empty result is a normal outcome.
    pub fn find(&self, resolver: &ValueResolver<'_>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for (oid, mode_map) in &self.index {
            for (mode, value_map) in mode_map {
                let resolved = match resolver.resolve_as(oid, *mode) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                let Some(groups) = value_map.get(&resolved) else {
                    continue;
                };
                for group in groups {
                    if seen.insert(group.clone()) {
                        debug!(oid = %oid, mode = %mode, value = %resolved, group = %group, "Lookup matched");
                        found.push(group.clone());
                    }
                }
            }
        }

        if found.is_empty() {
            debug!("No rule group matched event bindings");
        }
        found
    }

    /// Number of distinct OIDs in the index.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no Select contributed to the index.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
