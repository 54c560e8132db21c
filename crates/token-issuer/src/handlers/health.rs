//! Health check handlers.
//!
//! Liveness always answers 200. Readiness also answers 200, reporting the
//! active key and rotation health in the body; a stale key is a reason to
//! alert, not to stop serving tokens.

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Liveness probe handler.
pub async fn livez() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "ready",
///   "key_id": "key_4",
///   "key_generation": 4,
///   "consecutive_rotation_failures": 0
/// }
/// ```
#[instrument(skip_all, name = "issuer.health.readyz")]
pub async fn readyz(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let active = state.rotator.get_latest();
    let failures = state.rotator.consecutive_failures();

    let status = if failures >= state.rotation_failure_threshold {
        "degraded"
    } else {
        "ready"
    };

    Json(ReadinessResponse {
        status: status.to_string(),
        key_id: active.key_id,
        key_generation: active.generation,
        consecutive_rotation_failures: failures,
    })
}

/// Prometheus scrape handler.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
