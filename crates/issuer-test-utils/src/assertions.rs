//! Custom test assertions for issued tokens.
//!
//! These decode the token without verifying the signature; use
//! `fixtures::verify_token` for that.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::Value;

/// JWT header structure
#[derive(Debug, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
    #[serde(default)]
    pub kid: Option<String>,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let parts: Vec<_> = token.split('.').collect();
    let part = parts
        .get(index)
        .unwrap_or_else(|| panic!("JWT has no segment {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {}", index, e))
}

/// Decode the JOSE header of `token`.
pub fn decode_header(token: &str) -> JwtHeader {
    serde_json::from_slice(&segment(token, 0)).expect("Failed to parse JWT header")
}

/// Decode the claims of `token` as a JSON object.
pub fn decode_payload(token: &str) -> serde_json::Map<String, Value> {
    match serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims") {
        Value::Object(map) => map,
        other => panic!("JWT claims must be an object, got {}", other),
    }
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_signed_by("key_1")
///     .assert_for_subject("user_1")
///     .assert_expires_in(15);
/// ```
pub trait TokenAssertions {
    /// Assert that the token is a three-part RS256 JWT
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the token header names the specified key
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert that the token expires `seconds` after it was issued
    fn assert_expires_in(&self, seconds: u64) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert that the token does not carry the named claim at all
    fn assert_claim_absent(&self, claim: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts: Vec<_> = self.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts.len()
        );

        let header = decode_header(self);
        assert_eq!(header.alg, "RS256", "Expected RS256 algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");

        let claims = decode_payload(self);
        assert!(claims.contains_key("exp"), "JWT must carry an exp claim");

        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = decode_header(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(key_id),
            "Expected key_id '{}', got {:?}",
            key_id,
            header.kid
        );

        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims = decode_payload(self);
        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .expect("JWT exp claim must be an integer");
        let iat = claims
            .get("iat")
            .and_then(Value::as_i64)
            .expect("JWT iat claim must be an integer");

        assert_eq!(
            exp - iat,
            seconds as i64,
            "Expected token to expire {} seconds after issue, got {}",
            seconds,
            exp - iat
        );

        // Issued just now, allowing 5 seconds for slow test runners
        let now = chrono::Utc::now().timestamp();
        assert!(
            (now - iat).abs() <= 5,
            "Token iat {} is not close to now ({})",
            iat,
            now
        );

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = decode_payload(self);
        let sub = claims.get("sub").and_then(Value::as_str);
        assert_eq!(
            sub,
            Some(subject),
            "Expected subject '{}', got {:?}",
            subject,
            sub
        );

        self
    }

    fn assert_claim_absent(&self, claim: &str) -> &Self {
        let claims = decode_payload(self);
        assert!(
            !claims.contains_key(claim),
            "Expected no '{}' claim, got {:?}",
            claim,
            claims.get(claim)
        );

        self
    }
}
