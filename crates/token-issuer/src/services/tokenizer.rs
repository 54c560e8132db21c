//! Bearer token issuance.
//!
//! Tokens are compact RS256 JWS values:
//!
//! - header: `{"alg": "RS256", "typ": "JWT", "kid": <KMS key id>}`
//! - payload: `{iss, aud, iat, nbf, exp, sub?, purpose?, refresh_token?}`
//!
//! Optional claims are omitted entirely when absent. Each call signs with a
//! single snapshot of the active key, so the `kid` always names the key that
//! produced the signature even if a rotation lands mid-call.

use crate::crypto::SigningKeySnapshot;
use crate::errors::IssuerError;
use crate::observability::metrics::record_token_issuance;
use crate::services::key_rotator::SigningKeySource;
use common::secret::ExposeSecret;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Issuer (`iss`) of every token.
pub const TOKEN_ISSUER: &str = "ircforeverservices";

/// Audience (`aud`) of every token.
pub const TOKEN_AUDIENCE: &str = "ircforeverusers";

/// Token lifetime when the caller does not pass a TTL (15 minutes).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Caller-supplied claims. Every field is optional.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Claims {
    pub subject: Option<String>,
    pub ttl: Option<Duration>,
    pub purpose: Option<String>,
    pub refresh_token: Option<String>,
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// Subject and refresh token identify a user session; keep them out of logs.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("subject", &self.subject.as_ref().map(|_| "[REDACTED]"))
            .field("ttl", &self.ttl)
            .field("purpose", &self.purpose)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// JWT payload as serialized on the wire.
#[derive(Serialize)]
struct TokenClaims<'a> {
    iss: &'static str,
    aud: &'static str,
    iat: i64,
    nbf: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

impl<'a> TokenClaims<'a> {
    fn build(claims: &'a Claims, now: i64, default_ttl: Duration) -> Self {
        let ttl = claims.ttl.unwrap_or(default_ttl);
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        Self {
            iss: TOKEN_ISSUER,
            aud: TOKEN_AUDIENCE,
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl_secs),
            sub: claims.subject.as_deref(),
            purpose: claims.purpose.as_deref(),
            refresh_token: claims.refresh_token.as_deref(),
        }
    }
}

/// Something that can mint bearer tokens.
///
/// Request handlers depend on this trait rather than on `Tokenizer`.
pub trait TokenIssuer: Send + Sync {
    fn tokenize(&self, claims: &Claims) -> Result<String, IssuerError>;
}

/// Signs tokens with the key currently published by a `SigningKeySource`.
#[derive(Clone)]
pub struct Tokenizer {
    keys: Arc<dyn SigningKeySource>,
    default_ttl: Duration,
}

impl Tokenizer {
    pub fn new(keys: Arc<dyn SigningKeySource>) -> Self {
        Self {
            keys,
            default_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Override the lifetime used when `Claims::ttl` is absent.
    #[must_use]
    pub fn with_default_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn sign(&self, claims: &Claims, snapshot: &SigningKeySnapshot) -> Result<String, IssuerError> {
        let now = chrono::Utc::now().timestamp();
        let token_claims = TokenClaims::build(claims, now, self.default_ttl);

        let encoding_key = EncodingKey::from_rsa_pem(snapshot.private_key.expose_secret().as_bytes())
            .map_err(|e| {
                warn!(
                    target: "issuer.tokenizer",
                    key_id = %snapshot.key_id,
                    error = %e,
                    "Active signing key could not be parsed"
                );
                IssuerError::KeyFormat(format!("Invalid private key format: {}", e))
            })?;

        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(snapshot.key_id.clone());

        encode(&header, &token_claims, &encoding_key)
            .map_err(|e| IssuerError::Signing(format!("JWT signing operation failed: {}", e)))
    }
}

impl TokenIssuer for Tokenizer {
    #[instrument(skip_all)]
    fn tokenize(&self, claims: &Claims) -> Result<String, IssuerError> {
        let started = Instant::now();
        let snapshot = self.keys.signing_key();

        let result = self.sign(claims, &snapshot);

        let status = if result.is_ok() { "success" } else { "error" };
        record_token_issuance(status, started.elapsed());

        if result.is_ok() {
            debug!(
                target: "issuer.tokenizer",
                key_id = %snapshot.key_id,
                generation = snapshot.generation,
                "Token issued"
            );
        }

        result
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
