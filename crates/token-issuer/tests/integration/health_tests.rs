//! Health endpoint tests over real HTTP

use issuer_test_utils::{SequencedRegistrar, TestIssuerServer};
use reqwest::StatusCode;
use std::sync::Arc;
use token_issuer::models::ReadinessResponse;

#[tokio::test]
async fn test_livez_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestIssuerServer::spawn().await?;

    let response = reqwest::get(format!("{}/livez", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_readyz_tracks_rotation() -> Result<(), anyhow::Error> {
    let server = TestIssuerServer::spawn().await?;
    let client = reqwest::Client::new();

    let readiness: ReadinessResponse = client
        .get(format!("{}/readyz", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(readiness.status, "ready");
    assert_eq!(readiness.key_id, "key_1");
    assert_eq!(readiness.key_generation, 1);

    server.rotator().rotate().await?;

    let readiness: ReadinessResponse = client
        .get(format!("{}/readyz", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(readiness.key_id, "key_2");
    assert_eq!(readiness.key_generation, 2);

    Ok(())
}

#[tokio::test]
async fn test_readyz_degrades_after_repeated_failures() -> Result<(), anyhow::Error> {
    let registrar = Arc::new(SequencedRegistrar::new().fail_on([2, 3]));
    let server = TestIssuerServer::spawn_with_registrar(registrar, 2).await?;
    let client = reqwest::Client::new();

    assert!(server.rotator().rotate().await.is_err());
    let readiness: ReadinessResponse = client
        .get(format!("{}/readyz", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(readiness.status, "ready", "one failure is below the threshold");

    assert!(server.rotator().rotate().await.is_err());
    let response = client.get(format!("{}/readyz", server.url())).send().await?;
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "a stale key still signs valid tokens"
    );
    let readiness: ReadinessResponse = response.json().await?;
    assert_eq!(readiness.status, "degraded");
    assert_eq!(readiness.key_id, "key_1");
    assert_eq!(readiness.consecutive_rotation_failures, 2);

    // Recovery
    server.rotator().rotate().await?;
    let readiness: ReadinessResponse = client
        .get(format!("{}/readyz", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(readiness.status, "ready");
    assert_eq!(readiness.key_id, "key_4");

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() -> Result<(), anyhow::Error> {
    let server = TestIssuerServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
