use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One MIB definition keyed by its OID in the naming registry.
///
/// Entries are loaded in bulk at startup and held read-only for the life of
/// the process. `name` must be non-empty; the registry rejects entries that
/// violate this at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MibEntry {
    /// Symbolic name of the OID node, e.g. `snmpInTraps`.
    pub name: String,
    /// Free-text description from the MIB source.
    #[serde(default)]
    pub description: String,
    /// Units annotation from the MIB source, if any.
    #[serde(default)]
    pub units: String,
}

/// One SNMP variable binding delivered in a trap event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarBinding {
    /// Dotted numeric OID naming the variable.
    pub oid: String,
    /// SNMP type of the value as reported by the collector.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Literal value as a string.
    pub value: String,
}

/// Network origin of a trap as seen by the collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapSource {
    /// Source IP address of the trap sender.
    pub address: String,
    /// Resolved hostname of the trap sender.
    pub hostname: String,
    /// Internet-layer protocol, e.g. `ipv4`.
    #[serde(rename = "internetLayerProtocol", default)]
    pub internet_layer_protocol: String,
    /// Source port the trap arrived from.
    #[serde(default)]
    pub port: String,
    /// Transport-layer protocol, e.g. `udp`.
    #[serde(rename = "transportLayerProtocol", default)]
    pub transport_layer_protocol: String,
}

/// The snmptrapd receipt: everything the collector recorded about one trap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snmptrapd {
    /// RFC3339 timestamp the trap was received at.
    #[serde(default)]
    pub timestamp: String,
    /// Network origin of the trap.
    #[serde(default)]
    pub source: TrapSource,
    /// Variable bindings carried by the trap PDU.
    #[serde(default)]
    pub vars: Vec<VarBinding>,
    /// Transport-security/context string; contains device-identifying
    /// substrings matched by rule-group device identifiers.
    #[serde(rename = "pduSecurity", default)]
    pub pdu_security: String,
}

/// Receipts attached to an event by the upstream pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipts {
    /// The snmptrapd receipt.
    #[serde(default)]
    pub snmptrapd: Snmptrapd,
}

/// One normalized SNMP trap event as posted to the events endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostableEvent {
    /// API version stamped by the upstream pipeline.
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    /// Event kind stamped by the upstream pipeline, e.g. `SNMPTrap`.
    #[serde(default)]
    pub kind: String,
    /// Receipts recorded for this event.
    #[serde(default)]
    pub receipts: Receipts,
}

/// An alert in the Alertmanager v1 wire format.
///
/// Alerts are created fresh per rule match and never mutated after their
/// label set has been fingerprinted; ownership passes to the delivery layer.
/// Absent `starts_at`/`ends_at` serialize as omitted fields, which the
/// receiver treats as the zero time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Identifying label set; the dedup fingerprint is computed over this.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Non-identifying annotations.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// When the alerted condition started.
    #[serde(rename = "startsAt", skip_serializing_if = "Option::is_none", default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// When the alerted condition ended; set only on clearing alerts or via
    /// a configured expiry.
    #[serde(rename = "endsAt", skip_serializing_if = "Option::is_none", default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// URL identifying the producer of this alert.
    #[serde(rename = "generatorURL", default)]
    pub generator_url: String,
}

impl Alert {
    /// Create an alert with empty label and annotation maps.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_collector_payload() {
        let body = r#"{
            "apiVersion": "v1alpha1",
            "kind": "SNMPTrap",
            "receipts": {
                "snmptrapd": {
                    "timestamp": "2021-03-01T10:00:00Z",
                    "source": {"address": "192.168.1.28", "hostname": "nso1"},
                    "pduSecurity": "user-sha-aes128",
                    "vars": [
                        {"oid": ".1.3.6.1.6.3.1.1.4.1.0", "type": "OID", "value": ".1.3.6.1.4.1.8164.2.13"}
                    ]
                }
            }
        }"#;

        let event: PostableEvent = serde_json::from_str(body).unwrap();
        let trapd = &event.receipts.snmptrapd;
        assert_eq!(trapd.source.address, "192.168.1.28");
        assert_eq!(trapd.pdu_security, "user-sha-aes128");
        assert_eq!(trapd.vars.len(), 1);
        assert_eq!(trapd.vars[0].kind, "OID");
    }

    #[test]
    fn test_alert_omits_unset_timestamps() {
        let alert = Alert::new();
        let json = serde_json::to_string(&alert).unwrap();
        assert!(!json.contains("startsAt"));
        assert!(!json.contains("endsAt"));
        assert!(json.contains("generatorURL"));
    }
}
