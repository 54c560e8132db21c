//! HTTP routes for the token issuer.
//!
//! Only operational endpoints are served here; token issuance is consumed
//! in-process through `TokenIssuer`.

use crate::handlers;
use crate::services::KeyRotator;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide signing key rotator.
    pub rotator: Arc<KeyRotator>,

    /// Consecutive rotation failures before readiness reports `degraded`.
    pub rotation_failure_threshold: u32,

    /// Prometheus render handle.
    pub metrics: PrometheusHandle,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/livez` - Liveness probe
/// - `/readyz` - Readiness probe with key rotation health
/// - `/metrics` - Prometheus metrics
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    routes
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
