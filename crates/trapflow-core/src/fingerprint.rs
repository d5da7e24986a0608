//! Label-set fingerprinting.
//!
//! Computes the same FNV-1a hash over a sorted label set that the
//! Alertmanager side computes, so repeat deliveries of the same alert state
//! deduplicate correctly downstream. Label names are sorted before hashing,
//! making the fingerprint invariant under map insertion order.

use fnv::FnvHasher;
use std::collections::HashMap;
use std::hash::Hasher;

const SEPARATOR: u8 = 0xff;

/// Fingerprint `labels` as a 16-digit lowercase hex string.
pub fn labels_fingerprint(labels: &HashMap<String, String>) -> String {
    let mut names: Vec<&String> = labels.keys().collect();
    names.sort();

    let mut hasher = FnvHasher::default();
    for name in names {
        hasher.write(name.as_bytes());
        hasher.write_u8(SEPARATOR);
        hasher.write(labels[name].as_bytes());
        hasher.write_u8(SEPARATOR);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_fingerprint_invariant_under_insertion_order() {
        let a = labels(&[("alertname", "starCard"), ("source_address", "10.0.0.1")]);
        let b = labels(&[("source_address", "10.0.0.1"), ("alertname", "starCard")]);
        assert_eq!(labels_fingerprint(&a), labels_fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_changes_with_values() {
        let a = labels(&[("alertname", "starCard")]);
        let b = labels(&[("alertname", "starCardBootFailed")]);
        assert_ne!(labels_fingerprint(&a), labels_fingerprint(&b));
    }

    #[test]
    fn test_empty_label_set_is_fnv_offset_basis() {
        // FNV-1a 64 offset basis, the upstream empty-set signature.
        assert_eq!(labels_fingerprint(&HashMap::new()), "cbf29ce484222325");
    }
}
