//! Alert generation.
//!
//! Orchestrates the registry, resolver, and modifier engine to decide, per
//! candidate rule group and per rule, whether a firing and/or clearing alert
//! is produced for one event, and builds the final label/annotation sets.
//! Errors stay local to one rule/Select/Mod evaluation and never abort
//! processing of sibling rules or sibling events.

use crate::error::TrapflowError;
use crate::fingerprint::labels_fingerprint;
use crate::metrics::MetricsSink;
use crate::mib::MibRegistry;
use crate::modifier::Modifier;
use crate::rules::{AlertRule, RuleGroup, RuleGroupSet, Select, SourceType, effective_enabled};
use crate::value::ValueResolver;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};
use trapflow_types::{Alert, Snmptrapd};
use uuid::Uuid;

/// OID carrying the trap identity in every SNMPv2 trap PDU.
pub const SNMP_TRAP_OID: &str = ".1.3.6.1.6.3.1.1.4.1.0";

/// Annotation key carrying the event type.
pub const EVENT_TYPE_KEY: &str = "event_type";

/// Label key carrying the dedup fingerprint.
pub const FINGERPRINT_KEY: &str = "alert_fingerprint";

/// Alert name used for traps no rule recognized.
pub const UNKNOWN_ALERT_NAME: &str = "unknownSnmpTrap";

const OID_INFO_URL: &str = "http://www.oid-info.com/get/";

/// Whether a rule matched through its firing or clearing Select list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Firing,
    Clearing,
}

impl EventKind {
    /// The `event_type` annotation value for alerts of this kind.
    fn event_type(self) -> &'static str {
        match self {
            EventKind::Firing => "error",
            EventKind::Clearing => "clear",
        }
    }
}

/// Per-event alert generation context.
///
/// Constructed fresh for each inbound event over the shared read-only rule
/// set and registry, and discarded after producing that event's alerts.
pub struct AlertGenerator<'a> {
    groups: &'a RuleGroupSet,
    registry: &'a MibRegistry,
    resolver: &'a ValueResolver<'a>,
    trapd: &'a Snmptrapd,
    metrics: &'a dyn MetricsSink,
    /// Forward a synthetic alert for traps no rule recognized.
    pub forward_unknown: bool,
    /// Log unknown traps at info instead of debug.
    pub log_unknown: bool,
}

impl<'a> AlertGenerator<'a> {
    /// Create a generation context for one event.
    pub fn new(
        groups: &'a RuleGroupSet,
        registry: &'a MibRegistry,
        resolver: &'a ValueResolver<'a>,
        trapd: &'a Snmptrapd,
        metrics: &'a dyn MetricsSink,
    ) -> Self {
        Self {
            groups,
            registry,
            resolver,
            trapd,
            metrics,
            forward_unknown: false,
            log_unknown: false,
        }
    }

    /// Evaluate every candidate rule group and return all generated alerts.
    pub fn generate(&self, group_names: &[String]) -> Vec<Alert> {
        let fixed = self.fixed_annotations();
        let trap_value = match self.resolver.value(SNMP_TRAP_OID) {
            Ok(v) => v,
            Err(err) => {
                debug!(error = %err, "Failed to get trap OID value");
                String::new()
            }
        };

        let mut all_alerts = Vec::new();
        for group_name in group_names {
            let Some(group) = self.groups.get(group_name) else {
                warn!(
                    error = %TrapflowError::RuleGroupNotFound { name: group_name.clone() },
                    "Lookup returned an unloaded rule group"
                );
                continue;
            };

            if !self.device_identified(&group.defaults.device_identifiers) {
                debug!(
                    group = %group_name,
                    pdu_security = %self.trapd.pdu_security,
                    "Rule group not applicable for device"
                );
                continue;
            }

            let mut group_matched = false;
            for (rule_num, rule) in group.alerts.iter().enumerate() {
                if !effective_enabled(group.defaults.enabled, rule.enabled) {
                    debug!(group = %group_name, rule = %rule.name, rule_num, "Rule not enabled");
                    continue;
                }

                let mut rule_matched = false;

                if let Some(alert) = self.fire(group, rule, &fixed, group_name) {
                    all_alerts.push(alert);
                    rule_matched = true;
                    group_matched = true;
                }

                if let Some(cleared) = self.clear(group, rule, &fixed, group_name) {
                    all_alerts.extend(cleared);
                    rule_matched = true;
                    group_matched = true;
                }

                if !rule_matched {
                    debug!(
                        group = %group_name,
                        rule = %rule.name,
                        rule_num,
                        trap_oid_value = %trap_value,
                        "No match found for rule"
                    );
                    self.metrics.alert_not_generated("alert", &trap_value);
                }
            }

            if !group_matched {
                debug!(group = %group_name, trap_oid_value = %trap_value, "No match found for group");
                self.metrics.alert_not_generated("config", &trap_value);
                all_alerts.extend(self.unknown("config", &fixed, &trap_value));
            }
        }
        all_alerts
    }

    /// Unknown-trap handling for an event the lookup index produced no
    /// candidates for: the unknown counter always increments, and the
    /// synthetic alert is returned when unknown forwarding is on.
    pub fn generate_unknown(&self) -> Vec<Alert> {
        let fixed = self.fixed_annotations();
        let trap_value = self.resolver.value(SNMP_TRAP_OID).unwrap_or_default();
        self.unknown("event", &fixed, &trap_value)
    }

    /// Evaluate the rule's firing Selects; on match build the firing alert.
    fn fire(
        &self,
        group: &RuleGroup,
        rule: &AlertRule,
        fixed: &HashMap<String, String>,
        group_name: &str,
    ) -> Option<Alert> {
        let mut alert = self.match_rule(group, rule, EventKind::Firing, fixed, group_name)?;

        alert
            .annotations
            .insert(EVENT_TYPE_KEY.to_string(), EventKind::Firing.event_type().to_string());
        // The firing alert clears under its own trap identity.
        let alert_oid = alert.annotations.get("event_oid").cloned().unwrap_or_default();
        alert.labels.insert("alert_oid".to_string(), alert_oid.clone());
        self.metrics.alert_generated("firing", &alert_oid);

        self.set_starts_at(&mut alert);
        self.set_ends_at(group.defaults.ends_at, rule.ends_at, &mut alert);

        let fingerprint = labels_fingerprint(&alert.labels);
        alert.labels.insert(FINGERPRINT_KEY.to_string(), fingerprint);

        debug!(
            group = %group_name,
            rule = %rule.name,
            alert_type = "firing",
            labels = ?alert.labels,
            "Generated alert"
        );
        Some(alert)
    }

    /// Evaluate the rule's clearing Selects; on match expand into one
    /// clearing alert per value in the rule's *firing* values list, so every
    /// alert this rule knows how to open gets closed.
    fn clear(
        &self,
        group: &RuleGroup,
        rule: &AlertRule,
        fixed: &HashMap<String, String>,
        group_name: &str,
    ) -> Option<Vec<Alert>> {
        let mut alert = self.match_rule(group, rule, EventKind::Clearing, fixed, group_name)?;

        alert
            .annotations
            .insert(EVENT_TYPE_KEY.to_string(), EventKind::Clearing.event_type().to_string());
        alert.ends_at = Some(Utc::now());
        self.set_starts_at(&mut alert);
        self.set_ends_at(group.defaults.ends_at, rule.ends_at, &mut alert);
        self.metrics.clearing_event();

        let mut cleared = Vec::new();
        for select in &rule.firing.select {
            for value in &select.values {
                let mut clearing_alert = alert.clone();
                clearing_alert.labels.insert("alert_oid".to_string(), value.clone());
                self.metrics.alert_generated("clearing", value);

                let fingerprint = labels_fingerprint(&clearing_alert.labels);
                clearing_alert.labels.insert(FINGERPRINT_KEY.to_string(), fingerprint);

                debug!(
                    group = %group_name,
                    rule = %rule.name,
                    alert_type = "clearing",
                    alert_oid = %value,
                    "Generated alert"
                );
                cleared.push(clearing_alert);
            }
        }
        Some(cleared)
    }

    /// Match one rule's Select list and build the base alert on success.
    /// Resolution and mod errors are local: they are logged and collapse to
    /// "no alert" without touching sibling rules.
    fn match_rule(
        &self,
        group: &RuleGroup,
        rule: &AlertRule,
        kind: EventKind,
        fixed: &HashMap<String, String>,
        group_name: &str,
    ) -> Option<Alert> {
        let selects = match kind {
            EventKind::Firing => &rule.firing.select,
            EventKind::Clearing => &rule.clearing.select,
        };

        match self.selected(selects) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                debug!(group = %group_name, rule = %rule.name, error = %err, "Select did not resolve");
                return None;
            }
        }

        let mut alert = Alert::new();
        alert.annotations = fixed.clone();

        if let Err(err) = self.prepare_base(&mut alert, group) {
            warn!(group = %group_name, rule = %rule.name, error = %err, "Failed to prepare base alert");
            return None;
        }

        alert.annotations.insert("event_id".to_string(), Uuid::new_v4().to_string());

        if let Err(err) = self.apply_mods(&mut alert.labels, &rule.label_mods) {
            warn!(group = %group_name, rule = %rule.name, error = %err, "Failed to apply rule label mods");
            return None;
        }
        if let Err(err) = self.apply_mods(&mut alert.annotations, &rule.annotation_mods) {
            warn!(group = %group_name, rule = %rule.name, error = %err, "Failed to apply rule annotation mods");
            return None;
        }

        alert.generator_url = self
            .generator_url_prefix(&group.defaults.generator_url_prefix, &rule.generator_url_prefix)
            .to_string();
        if let Ok(trap_value) = self.resolver.value(SNMP_TRAP_OID) {
            alert.generator_url.push_str(trap_value.trim_start_matches('.'));
        }

        for select in selects {
            if let Err(err) = self.apply_mods(&mut alert.annotations, &select.annotation_mods) {
                warn!(group = %group_name, rule = %rule.name, error = %err, "Failed to apply select annotation mods");
                return None;
            }
        }

        Some(alert)
    }

    /// True when every Select resolves to a value inside its values set.
    /// An empty Select list never matches.
    fn selected(&self, selects: &[Select]) -> Result<bool, TrapflowError> {
        if selects.is_empty() {
            return Ok(false);
        }

        for select in selects {
            let resolved = self.resolver.resolve_as(&select.oid, select.resolve_as)?;
            if !select.values.iter().any(|v| *v == resolved) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Source attribution plus the group's default mods.
    fn prepare_base(&self, alert: &mut Alert, group: &RuleGroup) -> Result<(), TrapflowError> {
        let mut attributed = false;
        if group.defaults.source_type == SourceType::Cluster {
            'clusters: for (cluster_name, cluster) in &group.defaults.clusters {
                for address in &cluster.source_addresses {
                    if *address == self.trapd.source.address {
                        debug!(cluster = %cluster_name, address = %address, "Found cluster for source");
                        attributed = true;
                        for map in [&mut alert.labels, &mut alert.annotations] {
                            map.insert("source_address".to_string(), cluster_name.clone());
                            map.insert("source_hostname".to_string(), cluster_name.clone());
                        }
                        break 'clusters;
                    }
                }
            }
            if !attributed {
                self.metrics.unknown_cluster_ip();
            }
        }

        if !attributed {
            debug!(address = %self.trapd.source.address, "Using literal source for alert");
            for map in [&mut alert.labels, &mut alert.annotations] {
                map.insert("source_address".to_string(), self.trapd.source.address.clone());
                map.insert("source_hostname".to_string(), self.trapd.source.hostname.clone());
            }
        }

        self.apply_mods(&mut alert.labels, &group.defaults.label_mods)?;
        self.apply_mods(&mut alert.annotations, &group.defaults.annotation_mods)?;
        Ok(())
    }

    fn apply_mods(
        &self,
        map: &mut HashMap<String, String>,
        mods: &[crate::rules::Mod],
    ) -> Result<(), TrapflowError> {
        Modifier::new(map, self.resolver).apply(mods)
    }

    /// Build the synthetic alert for a trap no rule recognized. The unknown
    /// counter always increments; the alert itself is only produced when
    /// unknown forwarding is on.
    fn unknown(
        &self,
        level: &str,
        fixed: &HashMap<String, String>,
        trap_value: &str,
    ) -> Vec<Alert> {
        self.metrics.unknown_alert(level, trap_value);

        let trap_name = self.resolver.value_str_short(SNMP_TRAP_OID).unwrap_or_default();
        if self.log_unknown {
            info!(level, trap_oid_value = %trap_value, trap_oid_name = %trap_name, source = ?self.trapd.source, "Unknown alert");
        } else {
            debug!(level, trap_oid_value = %trap_value, trap_oid_name = %trap_name, source = ?self.trapd.source, "Unknown alert");
        }

        if !self.forward_unknown {
            return Vec::new();
        }

        let mut alert = Alert::new();
        alert.annotations = fixed.clone();
        let alert_oid = alert.annotations.get("event_oid").cloned().unwrap_or_default();
        alert.labels.insert("alertname".to_string(), UNKNOWN_ALERT_NAME.to_string());
        alert.labels.insert("alert_oid".to_string(), alert_oid);
        alert.labels.insert("source_address".to_string(), self.trapd.source.address.clone());
        alert.labels.insert("source_hostname".to_string(), self.trapd.source.hostname.clone());

        let fingerprint = labels_fingerprint(&alert.labels);
        alert.labels.insert(FINGERPRINT_KEY.to_string(), fingerprint);

        vec![alert]
    }

    /// Annotations that are fixed for one trap event, shared by every alert
    /// it generates.
    fn fixed_annotations(&self) -> HashMap<String, String> {
        let mut event_oid = String::new();
        let mut event_oid_string = String::new();
        let mut event_description = String::new();

        let mut enriched_vars: Vec<BTreeMap<String, String>> =
            Vec::with_capacity(self.trapd.vars.len());
        for binding in &self.trapd.vars {
            let mut enriched = BTreeMap::new();
            enriched.insert("oid".to_string(), binding.oid.clone());
            enriched.insert("type".to_string(), binding.kind.clone());
            enriched.insert("value".to_string(), binding.value.clone());

            let bare_oid = binding.oid.trim_start_matches('.');
            if let Some(entry) = self.registry.entry(bare_oid) {
                enriched.insert("name".to_string(), entry.name.clone());
                enriched.insert("description".to_string(), entry.description.clone());
                enriched.insert("units".to_string(), entry.units.clone());
            }
            enriched.insert("oid_string".to_string(), self.registry.string(bare_oid));
            enriched.insert("oid_uri".to_string(), format!("{OID_INFO_URL}{bare_oid}"));
            enriched_vars.push(enriched);

            if binding.oid == SNMP_TRAP_OID {
                event_oid = binding.value.clone();
                let bare_event_oid = event_oid.trim_start_matches('.');
                if let Some(entry) = self.registry.entry(bare_event_oid) {
                    event_description = entry.description.clone();
                    event_oid_string = self.registry.string(bare_event_oid);
                }
            }
        }

        let event_vars_json = serde_json::to_string(&enriched_vars).unwrap_or_default();

        HashMap::from([
            ("event_name".to_string(), "unknown".to_string()),
            ("event_oid".to_string(), event_oid),
            ("event_oid_string".to_string(), event_oid_string),
            ("event_snmptrapd_timestamp".to_string(), self.trapd.timestamp.clone()),
            (EVENT_TYPE_KEY.to_string(), "unknown".to_string()),
            ("event_vars_json".to_string(), event_vars_json),
            ("event_description".to_string(), event_description),
        ])
    }

    fn set_starts_at(&self, alert: &mut Alert) {
        match DateTime::parse_from_rfc3339(&self.trapd.timestamp) {
            Ok(t) => alert.starts_at = Some(t.with_timezone(&Utc)),
            Err(err) => {
                warn!(timestamp = %self.trapd.timestamp, error = %err, "Failed to parse trap timestamp");
            }
        }
    }

    /// Expire the alert `ends_at` minutes from now; the rule-level override
    /// wins over the group default; 0 means not configured.
    fn set_ends_at(&self, default_minutes: i64, rule_minutes: i64, alert: &mut Alert) {
        if default_minutes != 0 {
            alert.ends_at = Some(Utc::now() + Duration::minutes(default_minutes));
        }
        if rule_minutes != 0 {
            alert.ends_at = Some(Utc::now() + Duration::minutes(rule_minutes));
        }
    }

    /// The rule-level prefix wins when defined.
    fn generator_url_prefix<'p>(&self, default_prefix: &'p str, rule_prefix: &'p str) -> &'p str {
        if !rule_prefix.is_empty() {
            return rule_prefix;
        }
        default_prefix
    }

    /// A group with device identifiers only applies when the event's
    /// pduSecurity string contains one of them; an empty list accepts
    /// everything.
    fn device_identified(&self, identifiers: &[String]) -> bool {
        if identifiers.is_empty() {
            return true;
        }
        identifiers.iter().any(|id| self.trapd.pdu_security.contains(id.as_str()))
    }
}
