//! Observability module for the token issuer
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit field
//! allow-listing:
//! - **SAFE**: key ids, generations, durations, status labels
//! - **NEVER**: private keys, issued tokens, refresh tokens, subjects

pub mod metrics;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return its render handle.
///
/// # Errors
///
/// Fails if a global recorder is already installed.
pub fn install_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
