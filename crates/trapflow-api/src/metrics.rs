//! Prometheus metrics for the Trapflow handler.
//!
//! Bridges the engine's [`MetricsSink`] capability onto a process-local
//! prometheus registry and renders the `/metrics` exposition.

use prometheus::{
    Encoder, IntCounter, IntCounterVec, TextEncoder, register_int_counter_vec_with_registry,
    register_int_counter_with_registry,
};
use tracing::info;
use trapflow_core::MetricsSink;

/// Counter set shared by every request handler.
#[derive(Clone, Debug)]
pub struct ApiMetrics {
    registry: prometheus::Registry,

    /// Events accepted on the events endpoint.
    pub events_received: IntCounter,
    /// Alerts generated, by alert type and trap identity.
    pub alerts_generated: IntCounterVec,
    /// Rules and groups that matched nothing, by level and trap identity.
    pub alerts_not_generated: IntCounterVec,
    /// Clearing conditions matched.
    pub clearing_events: IntCounter,
    /// Traps no rule recognized, by level and trap identity.
    pub unknown_alerts: IntCounterVec,
    /// Cluster-typed groups that saw an unlisted source address.
    pub unknown_cluster_ips: IntCounter,
    /// Alertmanager sub-batches that failed to deliver.
    pub delivery_failures: IntCounter,
}

impl ApiMetrics {
    /// Register the Trapflow counter set on a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        info!("Initializing API metrics");
        let registry = prometheus::Registry::new();

        let events_received = register_int_counter_with_registry!(
            "trapflow_events_received_total",
            "Total number of SNMP trap events received.",
            registry
        )?;
        let alerts_generated = register_int_counter_vec_with_registry!(
            "trapflow_alerts_generated_total",
            "Total number of alerts generated.",
            &["alert_type", "alert_oid"],
            registry
        )?;
        let alerts_not_generated = register_int_counter_vec_with_registry!(
            "trapflow_alerts_not_generated_total",
            "Total number of rule or group evaluations that matched nothing.",
            &["level", "alert_oid"],
            registry
        )?;
        let clearing_events = register_int_counter_with_registry!(
            "trapflow_clearing_events_total",
            "Total number of clearing conditions matched.",
            registry
        )?;
        let unknown_alerts = register_int_counter_vec_with_registry!(
            "trapflow_unknown_alerts_total",
            "Total number of traps no rule recognized.",
            &["level", "alert_oid"],
            registry
        )?;
        let unknown_cluster_ips = register_int_counter_with_registry!(
            "trapflow_unknown_cluster_ips_total",
            "Total number of cluster lookups that saw an unlisted source address.",
            registry
        )?;
        let delivery_failures = register_int_counter_with_registry!(
            "trapflow_delivery_failures_total",
            "Total number of Alertmanager sub-batches that failed to deliver.",
            registry
        )?;

        Ok(Self {
            registry,
            events_received,
            alerts_generated,
            alerts_not_generated,
            clearing_events,
            unknown_alerts,
            unknown_cluster_ips,
            delivery_failures,
        })
    }

    /// Render the registry in the prometheus text exposition format.
    pub fn export(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %err, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl MetricsSink for ApiMetrics {
    fn alert_generated(&self, alert_type: &str, alert_oid: &str) {
        self.alerts_generated.with_label_values(&[alert_type, alert_oid]).inc();
    }

    fn alert_not_generated(&self, level: &str, alert_oid: &str) {
        self.alerts_not_generated.with_label_values(&[level, alert_oid]).inc();
    }

    fn clearing_event(&self) {
        self.clearing_events.inc();
    }

    fn unknown_alert(&self, level: &str, alert_oid: &str) {
        self.unknown_alerts.with_label_values(&[level, alert_oid]).inc();
    }

    fn unknown_cluster_ip(&self) {
        self.unknown_cluster_ips.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_export_contains_counters() {
        let metrics = ApiMetrics::new().unwrap();
        metrics.events_received.inc();
        metrics.alert_generated("firing", ".1.2.3");

        let exported = metrics.export();
        assert!(exported.contains("trapflow_events_received_total 1"));
        assert!(exported.contains("trapflow_alerts_generated_total"));
        assert!(exported.contains("alert_oid=\".1.2.3\""));
    }
}
