//! Trapflow Types
//!
//! This crate defines the core types and data structures shared across the
//! Trapflow ecosystem (`trapflow-core` and `trapflow-api`): the normalized
//! SNMP trap event envelope delivered by the upstream collector, the MIB
//! entry record, and the Alertmanager-compatible alert produced by the
//! correlation engine.

#![deny(warnings)]
#![deny(missing_docs)]

mod types;

pub use types::{Alert, MibEntry, PostableEvent, Receipts, Snmptrapd, TrapSource, VarBinding};
