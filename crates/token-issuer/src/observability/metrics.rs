//! Metrics definitions for the token issuer
//!
//! All metrics follow Prometheus naming conventions:
//! - `issuer_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: 2 values (success, error)
//! - `error_category`: 4 values (see `IssuerError::category`)

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `issuer_token_issuance_duration_seconds`, `issuer_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    histogram!("issuer_token_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("issuer_token_issuance_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// Key Management Metrics
// ============================================================================

/// Record a key rotation attempt
///
/// Metric: `issuer_key_rotation_total`
/// Labels: `status`, `error_category`
pub fn record_key_rotation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("issuer_key_rotation_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

/// Record a call to the key management service
///
/// Metric: `issuer_key_registration_duration_seconds`
/// Labels: `status`
pub fn record_key_registration(status: &str, duration: Duration) {
    histogram!("issuer_key_registration_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());
}

/// Update the active key generation gauge
///
/// Metric: `issuer_signing_key_generation`
pub fn set_signing_key_generation(generation: u64) {
    gauge!("issuer_signing_key_generation").set(generation as f64);
}

/// Update the consecutive rotation failure gauge
///
/// Metric: `issuer_key_rotation_consecutive_failures`
pub fn set_consecutive_rotation_failures(failures: u32) {
    gauge!("issuer_key_rotation_consecutive_failures").set(f64::from(failures));
}

/// Flag whether the active key is older than the rotation policy allows
///
/// Metric: `issuer_key_rotation_stale` (0 or 1)
pub fn set_key_rotation_stale(stale: bool) {
    gauge!("issuer_key_rotation_stale").set(if stale { 1.0 } else { 0.0 });
}

/// Record the timestamp of the last successful rotation
///
/// Metric: `issuer_key_rotation_last_success_timestamp`
pub fn set_key_rotation_last_success(timestamp_secs: f64) {
    gauge!("issuer_key_rotation_last_success_timestamp").set(timestamp_secs);
}
