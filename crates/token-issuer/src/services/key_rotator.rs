//! Rotating signing key.
//!
//! `KeyRotator` owns the active `SigningKeyPair`. It is created with one
//! registered key (construction fails otherwise) and afterwards only ever
//! replaces that key wholesale with another registered one.
//!
//! # Invariants
//!
//! - The published key always has a non-empty, KMS-assigned `key_id`.
//! - Key generation and registration happen before the container lock is
//!   taken; the swap itself is a single assignment.
//! - A failed rotation leaves the previous key active and consumes no
//!   generation number.
//! - Rotations are serialized with each other, so generations published to
//!   readers are strictly increasing. Readers never wait on rotations.

use crate::container::Container;
use crate::crypto::{self, SigningKeyPair, SigningKeySnapshot};
use crate::errors::IssuerError;
use crate::observability::metrics::{
    record_key_rotation, set_consecutive_rotation_failures, set_key_rotation_last_success,
    set_signing_key_generation,
};
use crate::services::registrar::PublicKeyRegistrar;
use crate::tasks::key_rotation::{start_key_rotation, KeyRotationConfig};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Result of a successful rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    pub previous_key_id: String,
    pub key_id: String,
    pub generation: u64,
}

/// Read access to the currently active signing key.
///
/// This is the only view of the rotator that token issuance needs.
pub trait SigningKeySource: Send + Sync {
    /// Snapshot of the active key. Never blocks on a rotation in progress.
    fn signing_key(&self) -> SigningKeySnapshot;
}

/// Owns the active signing key and rotates it on demand.
pub struct KeyRotator {
    keys: Container<Arc<SigningKeyPair>>,
    registrar: Arc<dyn PublicKeyRegistrar>,
    rotation_guard: tokio::sync::Mutex<()>,
    consecutive_failures: AtomicU32,
}

impl KeyRotator {
    /// Generate the first key pair and register it.
    ///
    /// # Errors
    ///
    /// Fails with `IssuerError::KeyGeneration` or `IssuerError::Registration`;
    /// the service must not start without a registered key.
    #[instrument(skip_all)]
    pub async fn new(registrar: Arc<dyn PublicKeyRegistrar>) -> Result<Self, IssuerError> {
        let mut key_pair = generate_registered_key_pair(registrar.as_ref()).await?;
        key_pair.generation = 1;

        info!(
            target: "issuer.rotation",
            key_id = %key_pair.key_id,
            generation = key_pair.generation,
            "Initial signing key registered"
        );
        set_signing_key_generation(key_pair.generation);
        set_consecutive_rotation_failures(0);

        Ok(Self {
            keys: Container::new(Arc::new(key_pair)),
            registrar,
            rotation_guard: tokio::sync::Mutex::new(()),
            consecutive_failures: AtomicU32::new(0),
        })
    }

    /// Replace the active key with a newly generated and registered one.
    ///
    /// On failure the previous key stays active and the error is returned
    /// for logging; callers that only care about the retained-key policy can
    /// ignore it.
    #[instrument(skip_all)]
    pub async fn rotate(&self) -> Result<RotationOutcome, IssuerError> {
        let _rotation = self.rotation_guard.lock().await;
        let previous = self.keys.get_latest();

        match generate_registered_key_pair(self.registrar.as_ref()).await {
            Ok(mut key_pair) => {
                key_pair.generation = previous.generation.saturating_add(1);
                let outcome = RotationOutcome {
                    previous_key_id: previous.key_id.clone(),
                    key_id: key_pair.key_id.clone(),
                    generation: key_pair.generation,
                };

                self.keys.replace_with(Arc::new(key_pair));
                self.consecutive_failures.store(0, Ordering::SeqCst);

                record_key_rotation("success", None);
                set_signing_key_generation(outcome.generation);
                set_consecutive_rotation_failures(0);
                set_key_rotation_last_success(chrono::Utc::now().timestamp() as f64);

                info!(
                    target: "issuer.rotation",
                    previous_key_id = %outcome.previous_key_id,
                    key_id = %outcome.key_id,
                    generation = outcome.generation,
                    "Signing key rotated"
                );

                Ok(outcome)
            }
            Err(e) => {
                let failures = self
                    .consecutive_failures
                    .fetch_add(1, Ordering::SeqCst)
                    .saturating_add(1);

                record_key_rotation("error", Some(e.category()));
                set_consecutive_rotation_failures(failures);

                warn!(
                    target: "issuer.rotation",
                    error = %e,
                    retained_key_id = %previous.key_id,
                    consecutive_failures = failures,
                    "Key rotation failed, keeping previous key"
                );

                Err(e)
            }
        }
    }

    /// Spawn the periodic rotation task for this rotator.
    ///
    /// The task sleeps `config.interval`, rotates, and repeats until
    /// `cancel_token` fires. Call it once per process; the caller is
    /// responsible for clamping the interval to its minimum.
    pub fn rotate_in_background(
        self: &Arc<Self>,
        config: KeyRotationConfig,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(start_key_rotation(Arc::clone(self), config, cancel_token))
    }

    /// Snapshot of the active key.
    pub fn get_latest(&self) -> SigningKeySnapshot {
        SigningKeySnapshot::from(self.keys.get_latest().as_ref())
    }

    /// Id of the active key.
    pub fn key_id(&self) -> String {
        self.keys.get_latest().key_id.clone()
    }

    /// SPKI PEM of the active public key.
    pub fn public_key(&self) -> String {
        self.keys.get_latest().public_key.clone()
    }

    /// Generation of the active key, starting at 1.
    pub fn generation(&self) -> u64 {
        self.keys.get_latest().generation
    }

    /// Number of rotation attempts that failed since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }
}

impl SigningKeySource for KeyRotator {
    fn signing_key(&self) -> SigningKeySnapshot {
        self.get_latest()
    }
}

impl fmt::Debug for KeyRotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.keys.get_latest();
        f.debug_struct("KeyRotator")
            .field("key_id", &active.key_id)
            .field("generation", &active.generation)
            .field("consecutive_failures", &self.consecutive_failures())
            .finish_non_exhaustive()
    }
}

/// Generate a key pair off the async runtime, then register its public key.
async fn generate_registered_key_pair(
    registrar: &dyn PublicKeyRegistrar,
) -> Result<SigningKeyPair, IssuerError> {
    let mut key_pair = tokio::task::spawn_blocking(crypto::generate_key_pair)
        .await
        .map_err(|e| IssuerError::KeyGeneration(format!("Key generation task failed: {}", e)))??;

    let key_id = registrar.register(&key_pair.public_key).await?;
    if key_id.is_empty() {
        return Err(IssuerError::Registration(
            "KMS returned an empty key id".to_string(),
        ));
    }

    key_pair.key_id = key_id;
    Ok(key_pair)
}
