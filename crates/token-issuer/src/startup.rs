//! Process assembly for the signing subsystem.
//!
//! There is no process-global rotator: the startup routine builds one
//! `KeyRotator`, hands the same `Arc` to the tokenizer and to the health
//! routes, and owns the cancellation token of its rotation task.

use crate::config::Config;
use crate::errors::IssuerError;
use crate::services::{KeyRotator, PublicKeyRegistrar, SigningKeySource, Tokenizer};
use crate::tasks::KeyRotationConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// The rotator and tokenizer sharing one active key.
#[derive(Debug, Clone)]
pub struct SigningStack {
    pub rotator: Arc<KeyRotator>,
    pub tokenizer: Tokenizer,
}

/// Register the first key and build the tokenizer on top of it.
///
/// # Errors
///
/// Fails when the first key cannot be generated or registered.
#[instrument(skip_all)]
pub async fn build_signing_stack(
    config: &Config,
    registrar: Arc<dyn PublicKeyRegistrar>,
) -> Result<SigningStack, IssuerError> {
    let rotator = Arc::new(KeyRotator::new(registrar).await?);

    let key_source: Arc<dyn SigningKeySource> = rotator.clone();
    let tokenizer = Tokenizer::new(key_source).with_default_ttl(config.token_ttl);

    Ok(SigningStack { rotator, tokenizer })
}

/// Handle to the running rotation task.
#[derive(Debug)]
pub struct RotationHandle {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl RotationHandle {
    /// Stop the rotation task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(
                target: "issuer.startup",
                error = %e,
                "Key rotation task ended abnormally"
            );
        }
    }
}

/// Start background rotation with the interval already clamped by `Config`.
pub fn start_rotation(rotator: &Arc<KeyRotator>, config: KeyRotationConfig) -> RotationHandle {
    info!(
        target: "issuer.startup",
        interval_seconds = config.interval.as_secs(),
        "Starting key rotation in background"
    );

    let cancel_token = CancellationToken::new();
    let task = rotator.rotate_in_background(config, cancel_token.clone());

    RotationHandle { cancel_token, task }
}
