//! Token issuance against a live rotator

use issuer_test_utils::{decode_payload, verify_token, SequencedRegistrar, TokenAssertions};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use token_issuer::services::{Claims, KeyRotator, SigningKeySource, TokenIssuer, Tokenizer};

async fn rotator_and_tokenizer(
) -> Result<(Arc<SequencedRegistrar>, Arc<KeyRotator>, Tokenizer), anyhow::Error> {
    let registrar = Arc::new(SequencedRegistrar::new());
    let rotator = Arc::new(KeyRotator::new(registrar.clone()).await?);
    let key_source: Arc<dyn SigningKeySource> = rotator.clone();
    Ok((registrar, rotator, Tokenizer::new(key_source)))
}

#[tokio::test]
async fn test_tokenize_subject_with_ttl() -> Result<(), anyhow::Error> {
    let (registrar, _rotator, tokenizer) = rotator_and_tokenizer().await?;

    let claims = Claims::new()
        .with_subject("user_1")
        .with_ttl(Duration::from_secs(15));
    let token = tokenizer.tokenize(&claims)?;

    token
        .assert_valid_jwt()
        .assert_signed_by("key_1")
        .assert_for_subject("user_1")
        .assert_expires_in(15)
        .assert_claim_absent("purpose")
        .assert_claim_absent("refresh_token");

    let public_key = registrar
        .public_key_for("key_1")
        .expect("key_1 should be registered");
    let verified = verify_token(&token, &public_key);
    assert_eq!(verified.claims["sub"], "user_1");

    Ok(())
}

#[tokio::test]
async fn test_tokenize_empty_claims_uses_default_ttl() -> Result<(), anyhow::Error> {
    let (_registrar, _rotator, tokenizer) = rotator_and_tokenizer().await?;

    let token = tokenizer.tokenize(&Claims::default())?;

    token
        .assert_valid_jwt()
        .assert_signed_by("key_1")
        .assert_expires_in(900)
        .assert_claim_absent("sub");

    Ok(())
}

#[tokio::test]
async fn test_tokenize_carries_purpose_and_refresh_token() -> Result<(), anyhow::Error> {
    let (_registrar, _rotator, tokenizer) = rotator_and_tokenizer().await?;

    let claims = Claims::new()
        .with_subject("user_2")
        .with_purpose("refresh")
        .with_refresh_token("opaque-refresh-value");
    let token = tokenizer.tokenize(&claims)?;

    let payload = decode_payload(&token);
    assert_eq!(payload["purpose"], "refresh");
    assert_eq!(payload["refresh_token"], "opaque-refresh-value");
    assert_eq!(payload["iss"], "ircforeverservices");
    assert_eq!(payload["aud"], "ircforeverusers");

    Ok(())
}

#[tokio::test]
async fn test_tokens_follow_rotation() -> Result<(), anyhow::Error> {
    let (registrar, rotator, tokenizer) = rotator_and_tokenizer().await?;
    let claims = Claims::new().with_subject("user_1");

    let before = tokenizer.tokenize(&claims)?;
    rotator.rotate().await?;
    let after = tokenizer.tokenize(&claims)?;

    before.assert_signed_by("key_1");
    after.assert_signed_by("key_2");

    let key_1 = registrar.public_key_for("key_1").expect("key_1 registered");
    let key_2 = registrar.public_key_for("key_2").expect("key_2 registered");

    // Tokens issued before a rotation still verify against their own key
    verify_token(&before, &key_1);
    verify_token(&after, &key_2);

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    let wrong_key = DecodingKey::from_rsa_pem(key_1.as_bytes())?;
    assert!(
        decode::<serde_json::Value>(&after, &wrong_key, &validation).is_err(),
        "a token signed after rotation must not verify with the retired key"
    );

    Ok(())
}

#[tokio::test]
async fn test_failed_rotation_keeps_signing_with_current_key() -> Result<(), anyhow::Error> {
    let registrar = Arc::new(SequencedRegistrar::new().fail_on([2]));
    let rotator = Arc::new(KeyRotator::new(registrar.clone()).await?);
    let tokenizer = Tokenizer::new(rotator.clone());

    assert!(rotator.rotate().await.is_err());

    let token = tokenizer.tokenize(&Claims::new().with_subject("user_1"))?;
    token.assert_signed_by("key_1");
    verify_token(&token, &registrar.public_key_for("key_1").expect("key_1 registered"));

    Ok(())
}
