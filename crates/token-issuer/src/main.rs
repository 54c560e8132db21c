//! Token Issuer
//!
//! Keeps an RSA signing key registered with the key management service,
//! rotates it on a schedule, and serves health and metrics endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use token_issuer::config::Config;
use token_issuer::observability::install_metrics_recorder;
use token_issuer::routes::{self, AppState};
use token_issuer::services::{KeyRotator, KmsKeyPublisher, PublicKeyRegistrar};
use token_issuer::startup::start_rotation;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration before tracing so the log format can be honoured
    let config = Config::from_env().inspect_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
    })?;

    common::observability::init_tracing(&config.observability)?;

    info!("Starting Token Issuer");
    info!(
        kms_url = %config.kms_url,
        bind_address = %config.bind_address,
        token_ttl_seconds = config.token_ttl.as_secs(),
        "Configuration loaded successfully"
    );

    if config.rotation_interval() != config.requested_rotation_interval {
        warn!(
            requested_seconds = config.requested_rotation_interval.as_secs(),
            applied_seconds = config.rotation_interval().as_secs(),
            "Requested key rotation interval is below the minimum, using the minimum"
        );
    }

    let metrics = install_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    info!("Loading keys...");
    let publisher: Arc<dyn PublicKeyRegistrar> = Arc::new(
        KmsKeyPublisher::new(&config.kms_url, config.kms_timeout).map_err(|e| {
            error!("Failed to create KMS publisher: {}", e);
            e
        })?,
    );

    // The binary only keeps the key registered and rotated; in-process
    // callers that issue tokens use `startup::build_signing_stack`.
    let rotator = Arc::new(KeyRotator::new(publisher).await.map_err(|e| {
        error!("Failed to create signing key rotator: {}", e);
        e
    })?);

    info!(key_id = %rotator.key_id(), "Keys loaded successfully");

    let rotation = start_rotation(&rotator, config.key_rotation());

    let state = Arc::new(AppState {
        rotator,
        rotation_failure_threshold: config.rotation_failure_threshold,
        metrics,
    });

    let app = routes::build_routes(state);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Token Issuer listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    rotation.shutdown().await;

    info!("Token Issuer shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
