#![deny(warnings)]
//! Trapflow HTTP API
//!
//! Process surface around the correlation engine: shared application state
//! built once at startup (rule set, MIB registry, lookup index, metrics,
//! notifier), the axum router, and the startup loaders that turn the
//! configured directories into engine inputs.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use axum::Router;
use chrono::{DateTime, Utc};
use tracing::info;
use trapflow_core::{LookupIndex, MibRegistry, MibStore, RuleGroupSet};

pub mod config;
pub mod metrics;
pub mod notifier;
pub mod routes;

use config::Settings;
use metrics::ApiMetrics;
use notifier::Notifier;

/// Shared, read-only application state.
///
/// The rule set, lookup index, and registry base entries require no locking
/// for reads; the registry's resolution cache and the metrics counters are
/// internally synchronized.
pub struct AppState {
    /// Loaded rule groups, immutable for the process lifetime.
    pub groups: RuleGroupSet,
    /// OID naming registry.
    pub registry: MibRegistry,
    /// Candidate rule-group index built from the rule set.
    pub lookup: LookupIndex,
    /// Shared counter set.
    pub metrics: ApiMetrics,
    /// Downstream alert transport.
    pub notifier: Arc<dyn Notifier>,
    /// Client for the Alertmanager health probe.
    pub http: reqwest::Client,
    /// Base URL of the downstream Alertmanager.
    pub am_url: String,
    /// Forward synthetic alerts for unrecognized traps.
    pub forward_unknown: bool,
    /// Log unrecognized traps at info instead of debug.
    pub log_unknown: bool,
    /// Process start time.
    pub start_time: DateTime<Utc>,
}

impl AppState {
    /// Assemble state from loaded inputs and the handler settings.
    pub fn new(
        settings: &Settings,
        groups: RuleGroupSet,
        registry: MibRegistry,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let lookup = LookupIndex::build(&groups);
        info!(
            groups = groups.len(),
            mib_entries = registry.len(),
            indexed_oids = lookup.len(),
            "Initialized application state"
        );

        Ok(Self {
            groups,
            registry,
            lookup,
            metrics: ApiMetrics::new()?,
            notifier,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(settings.am_timeout))
                .build()?,
            am_url: settings.am_url.clone(),
            forward_unknown: settings.forward_unknown,
            log_unknown: settings.log_unknown,
            start_time: Utc::now(),
        })
    }
}

/// Build the application router.
pub fn create_app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    routes::router(state, request_timeout)
}

/// Load the MIB registry from the configured cache file or MIBs directory.
/// Failures here are fatal at startup, never per-request.
pub fn load_mib_registry(settings: &Settings) -> anyhow::Result<MibRegistry> {
    let mut store = MibStore::new();
    if settings.cache_file != "none" {
        store.load_cache_file(Path::new(&settings.cache_file))?;
    } else {
        if settings.mibs_dir.is_empty() {
            bail!("no MIB cache file or MIBs directory configured");
        }
        store.load_json_dir(Path::new(&settings.mibs_dir))?;
    }

    let mut registry = MibRegistry::new();
    registry.load(store.entries)?;
    Ok(registry)
}
