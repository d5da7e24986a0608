#![deny(warnings)]
#![allow(missing_docs)]
//! Core functionality for the Trapflow SNMP alert correlation engine.
//!
//! This crate turns normalized SNMP trap events into Alertmanager-compatible
//! alerts: a MIB naming registry resolves OIDs to symbolic names, a
//! precomputed lookup index narrows each event to candidate rule groups, a
//! per-event value resolver answers six resolution modes (with one level of
//! indirection), and the alert generator evaluates firing and clearing
//! conditions, mutating label/annotation sets through the modifier engine
//! and fingerprinting the result for downstream deduplication.

/// Alert generation from matched rules
pub mod alert;
/// Structured error types for engine operations
pub mod error;
/// Alertmanager-compatible label-set fingerprinting
pub mod fingerprint;
/// Candidate rule-group lookup index
pub mod lookup;
/// Metrics-sink capability for counters shared across handlers
pub mod metrics;
/// OID naming registry with memoized resolution
pub mod mib;
/// MIB loading from JSON files and prebuilt caches
pub mod mib_store;
/// Label and annotation mutation directives
pub mod modifier;
/// Rule-group configuration model and loading
pub mod rules;
/// Per-event value resolution
pub mod value;

// Re-export the types the API layer works with.
pub use alert::{AlertGenerator, EVENT_TYPE_KEY, FINGERPRINT_KEY, SNMP_TRAP_OID, UNKNOWN_ALERT_NAME};
pub use error::{TrapflowError, TrapflowResult};
pub use fingerprint::labels_fingerprint;
pub use lookup::LookupIndex;
pub use metrics::{MetricsSink, NullMetrics, RecordingMetrics};
pub use mib::MibRegistry;
pub use mib_store::MibStore;
pub use rules::{RuleGroup, RuleGroupSet, Toggle, effective_enabled, load_rule_dir, parse_rule_groups};
pub use value::{ResolveAs, ValueResolver};
