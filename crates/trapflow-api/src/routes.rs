//! HTTP surface of the Trapflow handler.
//!
//! `POST /api/v2/events` is the ingestion path: each event in the batch is
//! narrowed through the lookup index, run through the alert generator, and
//! its alerts are delivered as independent firing and clearing sub-batches.
//! The remaining routes expose liveness, metrics, and build status.

use crate::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use trapflow_core::alert::{AlertGenerator, EVENT_TYPE_KEY};
use trapflow_core::value::ValueResolver;
use trapflow_types::{Alert, PostableEvent};

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the router over shared state.
pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/v2/status", get(status))
        .route("/api/v2/events", post(post_events))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn root() -> String {
    format!("trapflow {}", env!("CARGO_PKG_VERSION"))
}

async fn status() -> impl IntoResponse {
    Json(json!({
        "apiVersion": env!("CARGO_PKG_VERSION"),
        "description": "Alertmanager client for SNMP traps",
        "links": { "about": "https://github.com/your-org/trapflow" },
        "status": "success",
    }))
}

/// Proxy the downstream Alertmanager's health so load balancers stop
/// routing events when the receiver is gone.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let url = format!("{}/-/healthy", state.am_url.trim_end_matches('/'));
    match state.http.get(&url).send().await {
        Ok(response) if response.status().is_success() => (StatusCode::OK, "ok".to_string()),
        Ok(response) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("alertmanager health returned {}", response.status()),
        ),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("alertmanager unreachable: {err}")),
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export(),
    )
}

async fn post_events(
    State(state): State<Arc<AppState>>,
    Json(events): Json<Vec<PostableEvent>>,
) -> impl IntoResponse {
    info!(count = events.len(), "Received events");
    state.metrics.events_received.inc_by(events.len() as u64);

    let mut generated = 0usize;
    let mut delivery_failures = 0usize;

    for (index, event) in events.iter().enumerate() {
        let trapd = &event.receipts.snmptrapd;
        debug!(
            index,
            timestamp = %trapd.timestamp,
            hostname = %trapd.source.hostname,
            "Processing event"
        );

        let resolver = ValueResolver::new(&trapd.vars, &state.registry);
        let candidates = state.lookup.find(&resolver);

        let mut generator =
            AlertGenerator::new(&state.groups, &state.registry, &resolver, trapd, &state.metrics);
        generator.forward_unknown = state.forward_unknown;
        generator.log_unknown = state.log_unknown;

        let alerts = if candidates.is_empty() {
            debug!(index, "No rule group found for event");
            generator.generate_unknown()
        } else {
            generator.generate(&candidates)
        };

        info!(index, alerts = alerts.len(), "Generated alerts for event");
        generated += alerts.len();
        if alerts.is_empty() {
            continue;
        }

        // Firing and clearing go out as independent sub-batches so one
        // failure does not block the other.
        let (clearing, firing): (Vec<Alert>, Vec<Alert>) = alerts
            .into_iter()
            .partition(|a| a.annotations.get(EVENT_TYPE_KEY).is_some_and(|t| t == "clear"));

        for batch in [firing, clearing] {
            if batch.is_empty() {
                continue;
            }
            if let Err(err) = state.notifier.notify(&batch).await {
                error!(index, error = %err, "Failed to publish alerts for event");
                state.metrics.delivery_failures.inc();
                delivery_failures += 1;
            }
        }
    }

    let body = Json(json!({
        "received": events.len(),
        "generated": generated,
        "delivery_failures": delivery_failures,
    }));
    if delivery_failures > 0 {
        (StatusCode::SERVICE_UNAVAILABLE, body)
    } else {
        (StatusCode::OK, body)
    }
}
