/// Correlation Engine Integration Test
///
/// Exercises the full pipeline over a realistic rule set: lookup index
/// narrowing, firing and clearing evaluation, label/annotation mutation,
/// unknown-trap handling, and fingerprinting.
use std::collections::HashMap;

use trapflow_core::alert::{AlertGenerator, EVENT_TYPE_KEY, FINGERPRINT_KEY, SNMP_TRAP_OID};
use trapflow_core::lookup::LookupIndex;
use trapflow_core::metrics::RecordingMetrics;
use trapflow_core::mib::MibRegistry;
use trapflow_core::rules::{RuleGroupSet, parse_rule_groups};
use trapflow_core::value::ValueResolver;
use trapflow_types::{Alert, MibEntry, Snmptrapd, TrapSource, VarBinding};

const RULES: &str = r#"epc:
  defaults:
    enabled: true
    source_type: host
    generator_url_prefix: http://www.oid-info.com/get/
    label_mods:
    - type: set
      key: vendor
      value: cisco
    - type: set
      key: subsystem
      value: epc
  alerts:
  - name: starCard
    enabled: true
    label_mods:
    - type: set
      key: alertname
      value: starCard
    - type: set
      key: alert_severity
      value: error
    firing:
      select:
      - type: equals
        oid: .1.3.6.1.6.3.1.1.4.1.0
        as: value
        values:
        - .1.3.6.1.4.1.8164.2.13
        - .1.3.6.1.4.1.8164.2.4
        - .1.3.6.1.4.1.8164.2.7
        - .1.3.6.1.4.1.8164.2.44
        annotation_mods:
        - type: copy
          oid: .1.3.6.1.6.3.1.1.4.1.0
          as: value
          to_key: event_name
          map:
            .1.3.6.1.4.1.8164.2.13: starCardDown
    clearing:
      select:
      - type: equals
        oid: .1.3.6.1.6.3.1.1.4.1.0
        as: value
        values:
        - .1.3.6.1.4.1.8164.2.5
        - .1.3.6.1.4.1.8164.2.55
        annotation_mods:
        - type: copy
          oid: .1.3.6.1.6.3.1.1.4.1.0
          as: value
          to_key: event_name
          map:
            .1.3.6.1.4.1.8164.2.5: starCardUp
  - name: starCardActive
    label_mods:
    - type: set
      key: alertname
      value: starCardActive
    - type: set
      key: alert_severity
      value: informational
    firing:
      select:
      - type: equals
        oid: .1.3.6.1.6.3.1.1.4.1.0
        as: value
        values:
        - .1.3.6.1.4.1.8164.2.55
nso:
  defaults:
    source_type: cluster
    clusters:
      nso1.example.org:
        source_addresses:
        - 192.168.1.28
        - dead:beef::1
    device_identifiers:
    - user-sha-aes128
    label_mods:
    - type: set
      key: subsystem
      value: nso
  alerts:
  - name: packageLoadFailure
    label_mods:
    - type: set
      key: alertname
      value: packageLoadFailure
    firing:
      select:
      - type: equals
        oid: .1.3.6.1.6.3.1.1.4.1.0
        as: value
        values:
        - .1.3.6.1.4.1.24961.2.103.2.0.3
"#;

fn rule_groups() -> RuleGroupSet {
    parse_rule_groups(RULES).unwrap()
}

fn registry() -> MibRegistry {
    let mut reg = MibRegistry::new();
    reg.load(
        [
            ("1.3.6.1.4.1.8164.2.13", "starCardDown", "A card went down"),
            ("1.3.6.1.4.1.8164.2.55", "starCardActive", "A card became active"),
        ]
        .into_iter()
        .map(|(oid, name, desc)| {
            (
                oid.to_string(),
                MibEntry {
                    name: name.to_string(),
                    description: desc.to_string(),
                    units: String::new(),
                },
            )
        })
        .collect(),
    )
    .unwrap();
    reg
}

fn event(trap_value: &str, address: &str, pdu_security: &str) -> Snmptrapd {
    Snmptrapd {
        timestamp: "2020-05-01T22:22:53Z".to_string(),
        source: TrapSource {
            address: address.to_string(),
            hostname: "test-device-01".to_string(),
            ..Default::default()
        },
        vars: vec![
            VarBinding {
                oid: ".1.3.6.1.2.1.1.3.0".to_string(),
                kind: "Timeticks".to_string(),
                value: "(290240897) 33 days, 14:13:28.97".to_string(),
            },
            VarBinding {
                oid: SNMP_TRAP_OID.to_string(),
                kind: "OID".to_string(),
                value: trap_value.to_string(),
            },
        ],
        pdu_security: pdu_security.to_string(),
    }
}

fn generate(
    trapd: &Snmptrapd,
    metrics: &RecordingMetrics,
    forward_unknown: bool,
) -> (Vec<String>, Vec<Alert>) {
    let groups = rule_groups();
    let reg = registry();
    let index = LookupIndex::build(&groups);
    let resolver = ValueResolver::new(&trapd.vars, &reg);

    let candidates = index.find(&resolver);
    let mut generator = AlertGenerator::new(&groups, &reg, &resolver, trapd, metrics);
    generator.forward_unknown = forward_unknown;

    let alerts = if candidates.is_empty() {
        generator.generate_unknown()
    } else {
        generator.generate(&candidates)
    };
    (candidates, alerts)
}

#[test]
fn test_firing_event_produces_one_alert() {
    // Scenario A: the trap value appears in starCard's firing Select.
    let trapd = event(".1.3.6.1.4.1.8164.2.13", "10.0.0.1", "");
    let metrics = RecordingMetrics::new();
    let (candidates, alerts) = generate(&trapd, &metrics, false);

    assert_eq!(candidates, vec!["epc"]);
    assert_eq!(alerts.len(), 1);

    let alert = &alerts[0];
    assert_eq!(alert.labels["alertname"], "starCard");
    assert_eq!(alert.labels["alert_severity"], "error");
    assert_eq!(alert.labels["vendor"], "cisco");
    assert_eq!(alert.labels["alert_oid"], ".1.3.6.1.4.1.8164.2.13");
    assert_eq!(alert.labels["source_address"], "10.0.0.1");
    assert!(!alert.labels[FINGERPRINT_KEY].is_empty());

    assert_eq!(alert.annotations[EVENT_TYPE_KEY], "error");
    assert_eq!(alert.annotations["event_oid"], ".1.3.6.1.4.1.8164.2.13");
    // Select annotation mod translated the trap value through its map.
    assert_eq!(alert.annotations["event_name"], "starCardDown");
    assert!(!alert.annotations["event_id"].is_empty());

    assert_eq!(
        alert.generator_url,
        "http://www.oid-info.com/get/1.3.6.1.4.1.8164.2.13"
    );
    assert!(alert.starts_at.is_some());
    assert!(alert.ends_at.is_none(), "firing alerts carry no end time");

    assert_eq!(metrics.count("alerts_generated/firing/.1.3.6.1.4.1.8164.2.13"), 1);
}

#[test]
fn test_clearing_event_expands_over_firing_values() {
    // Scenario B: .2.5 appears only in starCard's clearing Select, so one
    // clearing alert is emitted per value the firing Select knows.
    let trapd = event(".1.3.6.1.4.1.8164.2.5", "10.0.0.1", "");
    let metrics = RecordingMetrics::new();
    let (candidates, alerts) = generate(&trapd, &metrics, false);

    assert_eq!(candidates, vec!["epc"]);
    assert_eq!(alerts.len(), 4);

    let mut cleared_oids: Vec<&str> =
        alerts.iter().map(|a| a.labels["alert_oid"].as_str()).collect();
    cleared_oids.sort();
    assert_eq!(
        cleared_oids,
        vec![
            ".1.3.6.1.4.1.8164.2.13",
            ".1.3.6.1.4.1.8164.2.4",
            ".1.3.6.1.4.1.8164.2.44",
            ".1.3.6.1.4.1.8164.2.7",
        ]
    );

    let mut fingerprints = std::collections::HashSet::new();
    for alert in &alerts {
        assert_eq!(alert.annotations[EVENT_TYPE_KEY], "clear");
        assert_eq!(alert.annotations["event_name"], "starCardUp");
        assert!(alert.ends_at.is_some(), "clearing alerts carry an end time");
        assert!(fingerprints.insert(alert.labels[FINGERPRINT_KEY].clone()));
    }

    assert_eq!(metrics.count("clearing_events"), 1);
    assert_eq!(metrics.count("alerts_generated"), 4);
}

#[test]
fn test_event_can_fire_and_clear_simultaneously() {
    // .2.55 fires starCardActive and clears starCard in the same group.
    let trapd = event(".1.3.6.1.4.1.8164.2.55", "10.0.0.1", "");
    let metrics = RecordingMetrics::new();
    let (_, alerts) = generate(&trapd, &metrics, false);

    let firing: Vec<&Alert> =
        alerts.iter().filter(|a| a.annotations[EVENT_TYPE_KEY] == "error").collect();
    let clearing: Vec<&Alert> =
        alerts.iter().filter(|a| a.annotations[EVENT_TYPE_KEY] == "clear").collect();

    assert_eq!(firing.len(), 1);
    assert_eq!(firing[0].labels["alertname"], "starCardActive");
    assert_eq!(clearing.len(), 4);
}

#[test]
fn test_unknown_trap_counter_and_forwarding() {
    // Scenario C: the trap value is absent from every Select and from the
    // lookup index.
    let trapd = event(".1.3.6.1.4.1.9.9.9.9", "10.0.0.1", "");

    let metrics = RecordingMetrics::new();
    let (candidates, alerts) = generate(&trapd, &metrics, false);
    assert!(candidates.is_empty());
    assert!(alerts.is_empty());
    assert_eq!(metrics.count("unknown_alerts"), 1);

    let metrics = RecordingMetrics::new();
    let (_, alerts) = generate(&trapd, &metrics, true);
    assert_eq!(alerts.len(), 1);
    assert_eq!(metrics.count("unknown_alerts"), 1);

    let unknown = &alerts[0];
    assert_eq!(unknown.labels["alertname"], "unknownSnmpTrap");
    assert_eq!(unknown.labels["alert_oid"], ".1.3.6.1.4.1.9.9.9.9");
    assert_eq!(unknown.labels["source_address"], "10.0.0.1");
    assert!(!unknown.labels[FINGERPRINT_KEY].is_empty());
}

#[test]
fn test_defaults_disabled_vetoes_rule_enabled() {
    // Scenario D: defaults.enabled=false beats the rule's enabled=true; the
    // group produces nothing even though the firing Select would match.
    let mut groups = rule_groups();
    groups.get_mut("epc").unwrap().defaults.enabled = trapflow_core::rules::Toggle::Disabled;

    let reg = registry();
    let index = LookupIndex::build(&groups);
    let trapd = event(".1.3.6.1.4.1.8164.2.13", "10.0.0.1", "");
    let resolver = ValueResolver::new(&trapd.vars, &reg);
    let metrics = RecordingMetrics::new();

    let candidates = index.find(&resolver);
    assert_eq!(candidates, vec!["epc"]);

    let generator = AlertGenerator::new(&groups, &reg, &resolver, &trapd, &metrics);
    let alerts = generator.generate(&candidates);
    assert!(alerts.is_empty());
    // The group matched nothing, so the unknown counter records it.
    assert_eq!(metrics.count("unknown_alerts/config/.1.3.6.1.4.1.8164.2.13"), 1);
    assert_eq!(metrics.count("alerts_generated"), 0);
}

#[test]
fn test_device_identifier_gates_group() {
    // nso only applies to devices whose pduSecurity carries its identifier.
    let trapd = event(".1.3.6.1.4.1.24961.2.103.2.0.3", "192.168.1.28", "TRAP2, user snmp-user");
    let metrics = RecordingMetrics::new();
    let (candidates, alerts) = generate(&trapd, &metrics, false);
    assert_eq!(candidates, vec!["nso"]);
    assert!(alerts.is_empty(), "device not identified, group skipped");

    let trapd = event(
        ".1.3.6.1.4.1.24961.2.103.2.0.3",
        "192.168.1.28",
        "TRAP2, user user-sha-aes128, context",
    );
    let metrics = RecordingMetrics::new();
    let (_, alerts) = generate(&trapd, &metrics, false);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].labels["alertname"], "packageLoadFailure");
}

#[test]
fn test_cluster_source_attribution() {
    let trapd = event(
        ".1.3.6.1.4.1.24961.2.103.2.0.3",
        "192.168.1.28",
        "user-sha-aes128",
    );
    let metrics = RecordingMetrics::new();
    let (_, alerts) = generate(&trapd, &metrics, false);
    assert_eq!(alerts.len(), 1);

    let alert = &alerts[0];
    assert_eq!(alert.labels["source_address"], "nso1.example.org");
    assert_eq!(alert.labels["source_hostname"], "nso1.example.org");
    assert_eq!(alert.annotations["source_address"], "nso1.example.org");

    // An address outside every cluster falls back to the literal source.
    let trapd = event(".1.3.6.1.4.1.24961.2.103.2.0.3", "10.9.9.9", "user-sha-aes128");
    let metrics = RecordingMetrics::new();
    let (_, alerts) = generate(&trapd, &metrics, false);
    assert_eq!(alerts[0].labels["source_address"], "10.9.9.9");
    assert_eq!(alerts[0].labels["source_hostname"], "test-device-01");
    assert_eq!(metrics.count("unknown_cluster_ips"), 1);
}

#[test]
fn test_fingerprint_matches_across_identical_label_sets() {
    // Two generations of the same event produce alerts whose fingerprints
    // agree, so the downstream receiver deduplicates repeat deliveries.
    let trapd = event(".1.3.6.1.4.1.8164.2.13", "10.0.0.1", "");
    let metrics = RecordingMetrics::new();
    let (_, first) = generate(&trapd, &metrics, false);
    let (_, second) = generate(&trapd, &metrics, false);
    assert_eq!(first[0].labels[FINGERPRINT_KEY], second[0].labels[FINGERPRINT_KEY]);

    // And the fingerprint is over labels only, order-independent.
    let mut reordered: HashMap<String, String> = HashMap::new();
    let mut keys: Vec<_> = first[0].labels.keys().collect();
    keys.sort();
    keys.reverse();
    for key in keys {
        if key != FINGERPRINT_KEY {
            reordered.insert(key.clone(), first[0].labels[key].clone());
        }
    }
    assert_eq!(
        trapflow_core::fingerprint::labels_fingerprint(&reordered),
        first[0].labels[FINGERPRINT_KEY]
    );
}
