//! Process assembly tests: config, KMS registration and rotation wiring

use issuer_test_utils::{verify_token, SequencedRegistrar, TokenAssertions};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use token_issuer::config::{Config, MIN_ROTATION_INTERVAL};
use token_issuer::services::{Claims, KmsKeyPublisher, TokenIssuer};
use token_issuer::startup::{build_signing_stack, start_rotation};
use token_issuer::tasks::KeyRotationConfig;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_with(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_vars(&vars).expect("config should load")
}

#[tokio::test]
async fn test_signing_stack_shares_one_active_key() -> Result<(), anyhow::Error> {
    let config = config_with(&[("JWT_VALIDITY_SECONDS", "60")]);
    let registrar = Arc::new(SequencedRegistrar::new());

    let stack = build_signing_stack(&config, registrar.clone()).await?;

    assert_eq!(stack.tokenizer.default_ttl(), Duration::from_secs(60));

    let token = stack.tokenizer.tokenize(&Claims::new())?;
    token.assert_signed_by("key_1").assert_expires_in(60);

    stack.rotator.rotate().await?;
    let token = stack.tokenizer.tokenize(&Claims::new())?;
    token.assert_signed_by("key_2");
    verify_token(&token, &registrar.public_key_for("key_2").expect("key_2 registered"));

    Ok(())
}

#[tokio::test]
async fn test_signing_stack_registers_with_kms() -> Result<(), anyhow::Error> {
    let kms = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("origin", kms.uri().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "registerPublicKey": { "id": "kms-key-42", "body": "" } }
        })))
        .expect(1)
        .mount(&kms)
        .await;

    let kms_url = format!("{}/graphql", kms.uri());
    let config = config_with(&[("INTERNAL_GRAPHQL_URL", kms_url.as_str())]);
    let publisher = Arc::new(KmsKeyPublisher::new(&config.kms_url, config.kms_timeout)?);

    let stack = build_signing_stack(&config, publisher).await?;

    assert_eq!(stack.rotator.key_id(), "kms-key-42");
    stack
        .tokenizer
        .tokenize(&Claims::new().with_subject("user_1"))?
        .assert_signed_by("kms-key-42");

    Ok(())
}

#[tokio::test]
async fn test_signing_stack_fails_when_kms_unavailable() -> Result<(), anyhow::Error> {
    let kms = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&kms)
        .await;

    let kms_url = kms.uri();
    let config = config_with(&[("INTERNAL_GRAPHQL_URL", kms_url.as_str())]);
    let publisher = Arc::new(KmsKeyPublisher::new(&config.kms_url, config.kms_timeout)?);

    let result = build_signing_stack(&config, publisher).await;

    assert!(result.is_err(), "startup must not proceed without a registered key");

    Ok(())
}

#[test]
fn test_short_rotation_interval_is_clamped() {
    let config = config_with(&[("KEY_ROLLING_DURATION_SECONDS", "1")]);

    assert_eq!(config.requested_rotation_interval, Duration::from_secs(1));
    assert_eq!(config.key_rotation().interval, MIN_ROTATION_INTERVAL);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rotation_handle_shutdown_stops_task() -> Result<(), anyhow::Error> {
    let config = config_with(&[]);
    let registrar = Arc::new(SequencedRegistrar::new());
    let stack = build_signing_stack(&config, registrar.clone()).await?;

    let rotation = start_rotation(
        &stack.rotator,
        KeyRotationConfig {
            interval: Duration::from_millis(20),
            failure_threshold: 3,
        },
    );

    tokio::time::timeout(Duration::from_secs(60), async {
        while stack.rotator.generation() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    tokio::time::timeout(Duration::from_secs(30), rotation.shutdown()).await?;

    let calls = registrar.calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registrar.calls(), calls);

    Ok(())
}
