//! OID naming registry.
//!
//! Maps numeric OID segments to their MIB definitions and resolves full
//! dotted paths to symbolic names, falling back to the raw numeric segment
//! wherever no definition is registered. Resolution of a full path is
//! memoized per distinct OID string; the cache sits behind an `RwLock` so
//! concurrent first-resolutions from different request handlers are safe.

use crate::error::{TrapflowError, TrapflowResult};
use std::collections::HashMap;
use std::sync::RwLock;
use trapflow_types::MibEntry;

/// Registry of MIB definitions keyed by OID, with memoized path resolution.
///
/// Base entries are loaded once at startup and held read-only for the
/// process lifetime; only the derived resolution cache mutates afterwards.
#[derive(Debug, Default)]
pub struct MibRegistry {
    entries: HashMap<String, MibEntry>,
    resolved: RwLock<HashMap<String, String>>,
}

impl MibRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the MIB entry registered for exactly `oid`, if any.
    pub fn entry(&self, oid: &str) -> Option<&MibEntry> {
        self.entries.get(oid)
    }

    /// Bulk-load `entries` into the registry.
    ///
    /// The load is atomic: every entry is validated before any is committed,
    /// so a failed load leaves the registry unchanged. Fails with
    /// [`TrapflowError::EmptyMibName`] if any entry has an empty name.
    pub fn load(&mut self, entries: HashMap<String, MibEntry>) -> TrapflowResult<()> {
        for (oid, entry) in &entries {
            if entry.name.is_empty() {
                return Err(TrapflowError::EmptyMibName { oid: oid.clone() });
            }
        }
        self.entries.extend(entries);
        // Previously resolved paths may mention segments the new entries now
        // name; drop them so resolution stays consistent with the entry set.
        self.resolved.write().expect("mib cache poisoned").clear();
        Ok(())
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the dot-joined symbolic path for `oid`.
    ///
    /// Each prefix segment resolves to its registered name when one exists,
    /// otherwise to the raw numeric segment. Leading empty segments (OIDs
    /// starting with `.`) are preserved verbatim.
    ///
    /// Ex: `1.3.6.1.2.1.11.19` -> `iso.org.dod.internet.mgmt.mib-2.snmp.snmpInTraps`
    ///     `1.3.6.1.2.1.11.19.54334` -> `...snmpInTraps.54334`
    pub fn string(&self, oid: &str) -> String {
        if let Some(hit) = self.resolved.read().expect("mib cache poisoned").get(oid) {
            return hit.clone();
        }

        let name = self.resolve_path(oid).join(".");
        self.resolved
            .write()
            .expect("mib cache poisoned")
            .insert(oid.to_string(), name.clone());
        name
    }

    /// Return only the name of the exact OID if registered, empty string
    /// otherwise. No numeric fallback, no prefix walking.
    ///
    /// Ex: `1.3.6.1.2.1.11.19` -> `snmpInTraps`
    pub fn short_string(&self, oid: &str) -> String {
        self.entries.get(oid).map(|e| e.name.clone()).unwrap_or_default()
    }

    fn resolve_path(&self, oid: &str) -> Vec<String> {
        if let Some(idx) = oid.rfind('.') {
            let mut prefix = self.resolve_path(&oid[..idx]);
            match self.entries.get(oid) {
                Some(entry) => prefix.push(entry.name.clone()),
                None => prefix.push(oid[idx + 1..].to_string()),
            }
            prefix
        } else {
            match self.entries.get(oid) {
                Some(entry) => vec![entry.name.clone()],
                None => vec![oid.to_string()],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> MibEntry {
        MibEntry { name: name.to_string(), ..Default::default() }
    }

    fn registry(entries: &[(&str, &str)]) -> MibRegistry {
        let mut reg = MibRegistry::new();
        reg.load(entries.iter().map(|(oid, name)| (oid.to_string(), entry(name))).collect())
            .unwrap();
        reg
    }

    #[test]
    fn test_string_falls_back_to_numeric_segments() {
        let reg = registry(&[("1", "A"), ("1.2", "B")]);
        assert_eq!(reg.string("1.2.9"), "A.B.9");
    }

    #[test]
    fn test_string_preserves_leading_dot() {
        let reg = registry(&[("1", "iso")]);
        assert_eq!(reg.string(".1.9"), ".1.9");
        assert_eq!(reg.string("1.9"), "iso.9");
    }

    #[test]
    fn test_string_is_deterministic_and_idempotent() {
        let reg = registry(&[("1", "A"), ("1.2", "B"), ("1.2.3", "C")]);
        let first = reg.string("1.2.3.4");
        assert_eq!(first, "A.B.C.4");
        // Second call is served from the memo cache.
        assert_eq!(reg.string("1.2.3.4"), first);
    }

    #[test]
    fn test_short_string_exact_match_only() {
        let reg = registry(&[("1.3.6.1.2.1.11.19", "snmpInTraps")]);
        assert_eq!(reg.short_string("1.3.6.1.2.1.11.19"), "snmpInTraps");
        assert_eq!(reg.short_string("1.3.6.1.2.1.11"), "");
        assert_eq!(reg.short_string("1.3.6.1.2.1.11.19.1"), "");
    }

    #[test]
    fn test_load_rejects_empty_name_atomically() {
        let mut reg = MibRegistry::new();
        let mut entries = HashMap::new();
        entries.insert("1".to_string(), entry("A"));
        entries.insert("1.2".to_string(), entry(""));
        let err = reg.load(entries).unwrap_err();
        assert!(matches!(err, TrapflowError::EmptyMibName { .. }));
        // Nothing committed, including the valid entry.
        assert!(reg.is_empty());
        assert_eq!(reg.string("1"), "1");
    }

    #[test]
    fn test_load_clears_resolution_cache() {
        let mut reg = registry(&[("1", "A")]);
        assert_eq!(reg.string("1.2"), "A.2");
        reg.load([("1.2".to_string(), entry("B"))].into_iter().collect()).unwrap();
        assert_eq!(reg.string("1.2"), "A.B");
    }
}
