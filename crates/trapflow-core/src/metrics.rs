//! Metrics capability for the alert generator.
//!
//! Counters are shared mutable state incremented from many concurrent
//! request handlers, so the engine takes a sink capability instead of
//! touching a metrics backend directly; the API layer bridges this to its
//! prometheus registry, and tests use [`RecordingMetrics`].

use std::collections::HashMap;
use std::sync::Mutex;

/// Counter sink the alert generator reports into.
pub trait MetricsSink: Send + Sync {
    /// An alert was generated. `alert_type` is `firing` or `clearing`.
    fn alert_generated(&self, alert_type: &str, alert_oid: &str);
    /// A rule (`level=alert`) or a whole group (`level=config`) matched
    /// nothing for an event.
    fn alert_not_generated(&self, level: &str, alert_oid: &str);
    /// A clearing condition matched.
    fn clearing_event(&self);
    /// An unknown trap was seen (whether or not it was forwarded).
    fn unknown_alert(&self, level: &str, alert_oid: &str);
    /// A cluster-typed group saw a source address outside every cluster.
    fn unknown_cluster_ip(&self);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn alert_generated(&self, _alert_type: &str, _alert_oid: &str) {}
    fn alert_not_generated(&self, _level: &str, _alert_oid: &str) {}
    fn clearing_event(&self) {}
    fn unknown_alert(&self, _level: &str, _alert_oid: &str) {}
    fn unknown_cluster_ip(&self) {}
}

/// In-memory sink recording labeled counts, for tests and debugging.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    counts: Mutex<HashMap<String, u64>>,
}

impl RecordingMetrics {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for a recorded key, 0 if never incremented.
    pub fn count(&self, key: &str) -> u64 {
        *self.counts.lock().expect("metrics lock poisoned").get(key).unwrap_or(&0)
    }

    fn incr(&self, key: String) {
        *self.counts.lock().expect("metrics lock poisoned").entry(key).or_insert(0) += 1;
    }
}

impl MetricsSink for RecordingMetrics {
    fn alert_generated(&self, alert_type: &str, alert_oid: &str) {
        self.incr(format!("alerts_generated/{alert_type}/{alert_oid}"));
        self.incr("alerts_generated".to_string());
    }

    fn alert_not_generated(&self, level: &str, alert_oid: &str) {
        self.incr(format!("alerts_not_generated/{level}/{alert_oid}"));
        self.incr("alerts_not_generated".to_string());
    }

    fn clearing_event(&self) {
        self.incr("clearing_events".to_string());
    }

    fn unknown_alert(&self, level: &str, alert_oid: &str) {
        self.incr(format!("unknown_alerts/{level}/{alert_oid}"));
        self.incr("unknown_alerts".to_string());
    }

    fn unknown_cluster_ip(&self) {
        self.incr("unknown_cluster_ips".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_metrics_counts() {
        let metrics = RecordingMetrics::new();
        metrics.alert_generated("firing", ".1.2.3");
        metrics.alert_generated("firing", ".1.2.3");
        metrics.clearing_event();

        assert_eq!(metrics.count("alerts_generated/firing/.1.2.3"), 2);
        assert_eq!(metrics.count("alerts_generated"), 2);
        assert_eq!(metrics.count("clearing_events"), 1);
        assert_eq!(metrics.count("unknown_alerts"), 0);
    }
}
