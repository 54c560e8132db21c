//! Cryptographic fixtures for tests.
//!
//! RSA generation is slow, so a single 2048-bit key is generated per test
//! binary and shared. Tests that need distinct keys should go through
//! `KeyRotator` and a registrar instead.

use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde_json::Value;
use std::sync::OnceLock;
use token_issuer::crypto::{generate_key_pair, SigningKeyPair, SigningKeySnapshot};
use token_issuer::services::tokenizer::{TOKEN_AUDIENCE, TOKEN_ISSUER};
use token_issuer::services::SigningKeySource;

/// Key id carried by `test_signing_key`.
pub const TEST_KEY_ID: &str = "test-key-1";

static TEST_SIGNING_KEY: OnceLock<SigningKeyPair> = OnceLock::new();

/// Shared registered key pair (`kid` = `TEST_KEY_ID`, generation 1).
pub fn test_signing_key() -> &'static SigningKeyPair {
    TEST_SIGNING_KEY.get_or_init(|| {
        let mut pair = generate_key_pair().expect("test key generation should succeed");
        pair.key_id = TEST_KEY_ID.to_string();
        pair.generation = 1;
        pair
    })
}

/// A `SigningKeySource` that always hands out the same key.
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    pair: SigningKeyPair,
}

impl StaticKeySource {
    pub fn new(pair: SigningKeyPair) -> Self {
        Self { pair }
    }

    /// Source backed by `test_signing_key`.
    pub fn shared() -> Self {
        Self::new(test_signing_key().clone())
    }

    pub fn public_key(&self) -> &str {
        &self.pair.public_key
    }
}

impl SigningKeySource for StaticKeySource {
    fn signing_key(&self) -> SigningKeySnapshot {
        SigningKeySnapshot::from(&self.pair)
    }
}

/// Verify an RS256 token against an SPKI public key PEM.
///
/// Checks signature, expiry, issuer and audience. Panics on failure.
pub fn verify_token(token: &str, public_key_pem: &str) -> TokenData<Value> {
    let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
        .expect("public key PEM should parse");

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_audience(&[TOKEN_AUDIENCE]);

    decode::<Value>(token, &decoding_key, &validation)
        .unwrap_or_else(|e| panic!("token failed verification: {}", e))
}
