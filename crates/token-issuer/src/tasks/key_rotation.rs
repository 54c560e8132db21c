//! Periodic signing key rotation task.
//!
//! Sleeps for the configured interval, rotates, and repeats. A failed
//! rotation keeps the previous key; the next tick is the retry. Once the
//! number of consecutive failures reaches the configured threshold the task
//! escalates (error log plus the `issuer_key_rotation_stale` gauge) once per
//! failure streak.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is triggered. A rotation that
//! is already in flight completes first.

use crate::observability::metrics::set_key_rotation_stale;
use crate::services::KeyRotator;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Default rotation interval (1 hour).
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(3600);

/// Default number of consecutive failures tolerated before escalating.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Configuration for the key rotation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRotationConfig {
    /// Time between rotation attempts.
    pub interval: Duration,
    /// Consecutive failures before the task escalates.
    pub failure_threshold: u32,
}

impl Default for KeyRotationConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_ROTATION_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

/// Run the rotation loop until `cancel_token` is cancelled.
#[instrument(skip_all, name = "issuer.task.key_rotation")]
pub async fn start_key_rotation(
    rotator: Arc<KeyRotator>,
    config: KeyRotationConfig,
    cancel_token: CancellationToken,
) {
    info!(
        target: "issuer.task.key_rotation",
        interval_seconds = config.interval.as_secs(),
        failure_threshold = config.failure_threshold,
        "Starting key rotation task"
    );

    let mut escalated = false;

    loop {
        tokio::select! {
            () = tokio::time::sleep(config.interval) => {
                run_rotation(&rotator, &config, &mut escalated).await;
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "issuer.task.key_rotation",
                    "Key rotation task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "issuer.task.key_rotation", "Key rotation task stopped");
}

/// Run a single rotation attempt and apply the escalation policy.
///
/// `escalated` carries the alarm state between ticks.
pub(crate) async fn run_rotation(
    rotator: &KeyRotator,
    config: &KeyRotationConfig,
    escalated: &mut bool,
) {
    match rotator.rotate().await {
        Ok(outcome) => {
            if *escalated {
                info!(
                    target: "issuer.task.key_rotation",
                    key_id = %outcome.key_id,
                    generation = outcome.generation,
                    "Key rotation recovered"
                );
                *escalated = false;
            }
            set_key_rotation_stale(false);
        }
        Err(e) => {
            let failures = rotator.consecutive_failures();
            if failures >= config.failure_threshold {
                if !*escalated {
                    error!(
                        target: "issuer.task.key_rotation",
                        error = %e,
                        consecutive_failures = failures,
                        failure_threshold = config.failure_threshold,
                        key_id = %rotator.key_id(),
                        "Key rotation failure threshold reached, signing key is stale"
                    );
                    *escalated = true;
                }
                set_key_rotation_stale(true);
            } else {
                warn!(
                    target: "issuer.task.key_rotation",
                    consecutive_failures = failures,
                    failure_threshold = config.failure_threshold,
                    "Key rotation skipped, will retry next interval"
                );
            }
        }
    }
}
