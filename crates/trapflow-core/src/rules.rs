//! Rule-group configuration model and loading.
//!
//! Rule files are YAML documents keyed by rule-group name. Each group has a
//! `defaults` block shared by its alerts and an `alerts` list of rules, each
//! with independent firing and clearing Select lists. The whole set is
//! loaded once per process lifetime; there is no hot reload.

use crate::error::{TrapflowError, TrapflowResult};
use crate::value::ResolveAs;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Tri-state enabled flag.
///
/// Rule files distinguish "not configured" from an explicit true/false, so
/// the flag is a three-value enum rather than a nullable bool. Precedence
/// over a (defaults, rule) pair is encoded in [`effective_enabled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toggle {
    /// Not configured.
    #[default]
    Unset,
    /// Explicitly enabled.
    Enabled,
    /// Explicitly disabled.
    Disabled,
}

impl<'de> Deserialize<'de> for Toggle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<bool>::deserialize(deserializer)? {
            Some(true) => Toggle::Enabled,
            Some(false) => Toggle::Disabled,
            None => Toggle::Unset,
        })
    }
}

/// Decide whether a rule runs, from the group default and the rule's own
/// flag. An explicit `false` on either level disables the rule; the group
/// default vetoes the rule's `true`.
///
/// | defaults | rule      | state    |
/// |----------|-----------|----------|
/// | unset    | unset     | enabled  |
/// | unset    | false     | disabled |
/// | unset    | true      | enabled  |
/// | false    | any       | disabled |
/// | true     | unset     | enabled  |
/// | true     | false     | disabled |
/// | true     | true      | enabled  |
pub fn effective_enabled(defaults: Toggle, rule: Toggle) -> bool {
    !matches!(defaults, Toggle::Disabled) && !matches!(rule, Toggle::Disabled)
}

/// How the event source is attributed on generated alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Label alerts with the literal source address/hostname.
    #[default]
    Host,
    /// Map the source address to a named cluster via `defaults.clusters`.
    Cluster,
}

/// Mod operation discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModKind {
    /// Write a fixed value under a key.
    Set,
    /// Resolve an OID and write the result under a key.
    Copy,
}

/// Error policy for a copy mod whose resolution fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Skip the failing mod and keep going.
    #[default]
    Send,
    /// Halt the remaining mods for this map and propagate.
    Drop,
}

/// One directive mutating a label or annotation map.
#[derive(Debug, Clone, Deserialize)]
pub struct Mod {
    /// Operation to perform.
    #[serde(rename = "type")]
    pub kind: ModKind,

    // Set specific keys.
    /// Destination key for a set mod.
    #[serde(default)]
    pub key: String,
    /// Value written by a set mod. May be empty to intentionally clear a key.
    #[serde(default)]
    pub value: String,

    // Copy specific keys.
    /// Source OID for a copy mod.
    #[serde(default)]
    pub oid: String,
    /// Resolution mode for the source OID.
    #[serde(rename = "as", default)]
    pub resolve_as: ResolveAs,
    /// Destination key for a copy mod.
    #[serde(default)]
    pub to_key: String,
    /// Policy when the source OID fails to resolve.
    #[serde(default)]
    pub on_error: OnError,
    /// Optional value translation map. When present, only resolved values
    /// found in the map are written (translated); absent keys write nothing.
    #[serde(default)]
    pub map: HashMap<String, String>,
}

/// Select condition discriminator. Only equality is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectKind {
    /// The resolved value must equal one of the listed values.
    #[default]
    Equals,
}

/// An equality condition against a resolved OID value.
///
/// A Select list is satisfied only if every Select in it resolves to a
/// value contained in its `values` set: AND across the list, OR within one
/// Select's `values`.
#[derive(Debug, Clone, Deserialize)]
pub struct Select {
    /// Condition type.
    #[serde(rename = "type", default)]
    pub kind: SelectKind,
    /// OID to resolve against the event.
    pub oid: String,
    /// Resolution mode.
    #[serde(rename = "as", default)]
    pub resolve_as: ResolveAs,
    /// Accepted values.
    #[serde(default)]
    pub values: Vec<String>,
    /// Annotation mods applied when this Select participates in a match.
    #[serde(default)]
    pub annotation_mods: Vec<Mod>,
}

/// Wrapper for the `select:` key under `firing:`/`clearing:`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectBlock {
    /// The Select list; empty lists never match.
    #[serde(default)]
    pub select: Vec<Select>,
}

/// Maps source addresses to their cluster name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cluster {
    /// Addresses that belong to this cluster.
    #[serde(default)]
    pub source_addresses: Vec<String>,
}

/// Defaults shared by every rule in a group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleDefaults {
    /// Group-level enable flag; `false` vetoes every rule in the group.
    #[serde(default)]
    pub enabled: Toggle,
    /// How alert sources are attributed.
    #[serde(default)]
    pub source_type: SourceType,
    /// Substrings matched against the event's pduSecurity string; an empty
    /// list accepts any device.
    #[serde(default)]
    pub device_identifiers: Vec<String>,
    /// Named clusters used when `source_type` is `cluster`.
    #[serde(default)]
    pub clusters: HashMap<String, Cluster>,
    /// Prefix for generated alert URLs.
    #[serde(default)]
    pub generator_url_prefix: String,
    /// Label mods applied to every alert of the group.
    #[serde(default)]
    pub label_mods: Vec<Mod>,
    /// Annotation mods applied to every alert of the group.
    #[serde(default)]
    pub annotation_mods: Vec<Mod>,
    /// Minutes after now at which generated alerts expire; 0 leaves the
    /// end time untouched.
    #[serde(default)]
    pub ends_at: i64,
}

/// One alerting rule: firing and clearing conditions plus its own mods.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertRule {
    /// Rule name, surfaced in logs and counters.
    #[serde(default)]
    pub name: String,
    /// Rule-level enable flag, combined with the group default.
    #[serde(default)]
    pub enabled: Toggle,
    /// Overrides the group's URL prefix when non-empty.
    #[serde(default)]
    pub generator_url_prefix: String,
    /// Label mods applied on top of the group defaults.
    #[serde(default)]
    pub label_mods: Vec<Mod>,
    /// Annotation mods applied on top of the group defaults.
    #[serde(default)]
    pub annotation_mods: Vec<Mod>,
    /// Conditions that open an alert.
    #[serde(default)]
    pub firing: SelectBlock,
    /// Conditions that close previously opened alerts.
    #[serde(default)]
    pub clearing: SelectBlock,
    /// Overrides the group's `ends_at` minutes when non-zero.
    #[serde(default)]
    pub ends_at: i64,
}

/// One named rule group: shared defaults plus its rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleGroup {
    /// Defaults applied to every rule in the group.
    #[serde(default)]
    pub defaults: RuleDefaults,
    /// The rules, evaluated in declared order.
    #[serde(default)]
    pub alerts: Vec<AlertRule>,
}

/// The full loaded rule set, keyed by rule-group name.
pub type RuleGroupSet = HashMap<String, RuleGroup>;

/// Parse one YAML document of rule groups.
pub fn parse_rule_groups(yaml: &str) -> TrapflowResult<RuleGroupSet> {
    serde_yaml::from_str(yaml).map_err(|e| TrapflowError::config(format!("parse rules: {e}")))
}

/// Load every `.yml`/`.yaml` file under `dir` into one rule set.
///
/// Files are read in sorted name order; a group name appearing in more than
/// one file resolves to the later file's definition.
pub fn load_rule_dir(dir: &Path) -> TrapflowResult<RuleGroupSet> {
    if !dir.is_dir() {
        return Err(TrapflowError::config(format!("path {} is not a directory", dir.display())));
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| TrapflowError::config(format!("read dir {}: {e}", dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            )
        })
        .collect();
    paths.sort();

    let mut groups = RuleGroupSet::new();
    for path in paths {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| TrapflowError::config(format!("read {}: {e}", path.display())))?;
        let parsed: RuleGroupSet = serde_yaml::from_str(&content)
            .map_err(|e| TrapflowError::config(format!("parse {}: {e}", path.display())))?;
        debug!(file = %path.display(), groups = parsed.len(), "Loaded rule file");
        groups.extend(parsed);
    }
    Ok(groups)
}
