//! Scripted `PublicKeyRegistrar` implementations.
//!
//! `SequencedRegistrar` answers the n-th call with `key_{n}` whether or not
//! that call is scripted to fail, so tests can read the attempt number off
//! the active key id.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use token_issuer::errors::IssuerError;
use token_issuer::services::PublicKeyRegistrar;

/// Registrar returning `key_1`, `key_2`, ... with optional scripted failures.
///
/// # Example
/// ```rust,ignore
/// // Third and sixth registrations are rejected
/// let registrar = SequencedRegistrar::new().fail_on([3, 6]);
/// ```
#[derive(Debug, Default)]
pub struct SequencedRegistrar {
    calls: AtomicU32,
    failing_calls: HashSet<u32>,
    registered: Mutex<HashMap<String, String>>,
}

impl SequencedRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the given 1-based call numbers.
    pub fn fail_on(mut self, calls: impl IntoIterator<Item = u32>) -> Self {
        self.failing_calls.extend(calls);
        self
    }

    /// Number of registration attempts so far, failed ones included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Public key PEM registered under `key_id`, if that registration succeeded.
    pub fn public_key_for(&self, key_id: &str) -> Option<String> {
        self.registered.lock().unwrap().get(key_id).cloned()
    }

    /// Every key id handed out so far.
    pub fn registered_key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registered.lock().unwrap().keys().cloned().collect();
        ids.sort_by_key(|id| {
            id.trim_start_matches("key_")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        });
        ids
    }
}

#[async_trait]
impl PublicKeyRegistrar for SequencedRegistrar {
    async fn register(&self, public_key_pem: &str) -> Result<String, IssuerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.failing_calls.contains(&call) {
            return Err(IssuerError::Registration(format!(
                "scripted failure on call {}",
                call
            )));
        }

        let key_id = format!("key_{}", call);
        self.registered
            .lock()
            .unwrap()
            .insert(key_id.clone(), public_key_pem.to_string());
        Ok(key_id)
    }
}

/// Registrar that rejects every key.
#[derive(Debug, Default)]
pub struct FailingRegistrar {
    calls: AtomicU32,
}

impl FailingRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublicKeyRegistrar for FailingRegistrar {
    async fn register(&self, _public_key_pem: &str) -> Result<String, IssuerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(IssuerError::Registration("key management service unavailable".to_string()))
    }
}
