//! Test server harness for E2E testing
//!
//! Provides `TestIssuerServer` for spawning the real health and metrics
//! router in tests.

use crate::registrars::SequencedRegistrar;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use token_issuer::routes::{self, AppState};
use token_issuer::services::{KeyRotator, PublicKeyRegistrar};
use token_issuer::tasks::key_rotation::DEFAULT_FAILURE_THRESHOLD;
use tokio::task::JoinHandle;

/// Test harness for spawning the token issuer's HTTP surface.
///
/// # Example
/// ```rust,ignore
/// let server = TestIssuerServer::spawn().await?;
/// let response = reqwest::get(format!("{}/readyz", server.url())).await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestIssuerServer {
    addr: SocketAddr,
    rotator: Arc<KeyRotator>,
    handle: JoinHandle<()>,
}

impl TestIssuerServer {
    /// Spawn a server backed by a fresh `SequencedRegistrar`.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_registrar(Arc::new(SequencedRegistrar::new()), DEFAULT_FAILURE_THRESHOLD)
            .await
    }

    /// Spawn a server whose rotator registers keys through `registrar`.
    ///
    /// The server will:
    /// - Register the first signing key
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    ///
    /// No rotation task is started; tests drive `rotator().rotate()` directly.
    pub async fn spawn_with_registrar(
        registrar: Arc<dyn PublicKeyRegistrar>,
        rotation_failure_threshold: u32,
    ) -> Result<Self, anyhow::Error> {
        let rotator = Arc::new(
            KeyRotator::new(registrar)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to register first key: {}", e))?,
        );

        // A standalone recorder, so tests don't fight over the global one
        let metrics = PrometheusBuilder::new().build_recorder().handle();

        let state = Arc::new(AppState {
            rotator: Arc::clone(&rotator),
            rotation_failure_threshold,
            metrics,
        });

        let app = routes::build_routes(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            rotator,
            handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The rotator behind the readiness endpoint.
    pub fn rotator(&self) -> &Arc<KeyRotator> {
        &self.rotator
    }
}

impl Drop for TestIssuerServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
