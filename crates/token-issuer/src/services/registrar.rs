//! Key registration seam.
//!
//! The rotator never talks to the key management service directly. It
//! hands each freshly generated public key to a `PublicKeyRegistrar` and
//! uses the returned identifier as the JWT `kid`.

use crate::errors::IssuerError;
use async_trait::async_trait;
use std::fmt;

/// Registers a public key with the external key management service.
///
/// Implementations must tolerate repeated calls: every call registers a new
/// key and may return a new identifier. The identifier is opaque to this
/// crate; an empty identifier is treated as a failed registration.
#[async_trait]
pub trait PublicKeyRegistrar: Send + Sync {
    /// Register `public_key_pem` (SPKI PEM) and return its key id.
    async fn register(&self, public_key_pem: &str) -> Result<String, IssuerError>;
}

/// Adapts a plain synchronous function into a `PublicKeyRegistrar`.
///
/// ```rust,ignore
/// let registrar = FnRegistrar::new(|_pem: &str| Ok("key_1".to_string()));
/// ```
pub struct FnRegistrar<F> {
    register_fn: F,
}

impl<F> FnRegistrar<F>
where
    F: Fn(&str) -> Result<String, IssuerError> + Send + Sync,
{
    pub fn new(register_fn: F) -> Self {
        Self { register_fn }
    }
}

impl<F> fmt::Debug for FnRegistrar<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRegistrar").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> PublicKeyRegistrar for FnRegistrar<F>
where
    F: Fn(&str) -> Result<String, IssuerError> + Send + Sync,
{
    async fn register(&self, public_key_pem: &str) -> Result<String, IssuerError> {
        (self.register_fn)(public_key_pem)
    }
}
