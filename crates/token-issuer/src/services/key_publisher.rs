//! Key management service (KMS) client.
//!
//! Registers public keys through the KMS GraphQL API:
//!
//! ```graphql
//! mutation PublishAPublicKey($publicKey: String!) {
//!   registerPublicKey(publicKey: $publicKey) { body id }
//! }
//! ```
//!
//! The returned `id` becomes the `kid` header of every token signed with the
//! matching private key. The KMS checks the `Origin` header, so each request
//! carries `scheme://host[:port]` derived from the endpoint URL.

use crate::errors::IssuerError;
use crate::observability::metrics::record_key_registration;
use crate::services::registrar::PublicKeyRegistrar;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Default HTTP request timeout for registration calls.
pub const DEFAULT_KMS_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for the HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const REGISTER_PUBLIC_KEY_MUTATION: &str = r#"
mutation PublishAPublicKey($publicKey: String!){
  registerPublicKey(publicKey: $publicKey) {
    body
    id
  }
}
"#;

/// Errors that can occur while talking to the KMS.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Invalid KMS endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("KMS returned status {0}")]
    UnexpectedStatus(u16),

    #[error("Invalid KMS response: {0}")]
    InvalidResponse(String),

    #[error("KMS rejected the key: {0}")]
    Rejected(String),

    #[error("KMS response did not contain a key id")]
    MissingKeyId,
}

impl From<PublishError> for IssuerError {
    fn from(err: PublishError) -> Self {
        IssuerError::Registration(err.to_string())
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<RegisterPublicKeyData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPublicKeyData {
    register_public_key: Option<RegisteredPublicKey>,
}

#[derive(Deserialize)]
struct RegisteredPublicKey {
    #[serde(default)]
    id: String,
    #[allow(dead_code)]
    #[serde(default)]
    body: Option<String>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Registers public keys with the KMS over GraphQL.
#[derive(Debug, Clone)]
pub struct KmsKeyPublisher {
    endpoint: Url,
    origin: String,
    http_client: reqwest::Client,
}

impl KmsKeyPublisher {
    /// Create a publisher for the given GraphQL endpoint.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::InvalidEndpoint` if the URL does not parse or is
    /// not http(s), and `PublishError::Http` if the client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, PublishError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| PublishError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let origin = origin_header(&endpoint)?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| PublishError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            origin,
            http_client,
        })
    }

    /// The `Origin` header value sent with every request.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Register a public key and return the KMS-assigned id.
    #[instrument(skip_all)]
    pub async fn publish(&self, public_key_pem: &str) -> Result<String, PublishError> {
        let body = serde_json::json!({
            "query": REGISTER_PUBLIC_KEY_MUTATION,
            "variables": { "publicKey": public_key_pem },
        });

        debug!(
            target: "issuer.publisher",
            endpoint = %self.endpoint,
            "Registering public key with KMS"
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header(reqwest::header::ORIGIN, &self.origin)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(target: "issuer.publisher", error = %e, "HTTP request failed");
                PublishError::Http(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target: "issuer.publisher",
                status = %status,
                "KMS returned non-success status"
            );
            return Err(PublishError::UnexpectedStatus(status.as_u16()));
        }

        let parsed: GraphQlResponse = response.json().await.map_err(|e| {
            warn!(target: "issuer.publisher", error = %e, "Failed to parse KMS response");
            PublishError::InvalidResponse(e.to_string())
        })?;

        if !parsed.errors.is_empty() {
            let messages = parsed
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!(target: "issuer.publisher", errors = %messages, "KMS rejected public key");
            return Err(PublishError::Rejected(messages));
        }

        let key_id = parsed
            .data
            .and_then(|data| data.register_public_key)
            .map(|key| key.id)
            .filter(|id| !id.is_empty())
            .ok_or(PublishError::MissingKeyId)?;

        debug!(target: "issuer.publisher", key_id = %key_id, "Public key registered");

        Ok(key_id)
    }
}

#[async_trait]
impl PublicKeyRegistrar for KmsKeyPublisher {
    async fn register(&self, public_key_pem: &str) -> Result<String, IssuerError> {
        let started = Instant::now();
        let result = self.publish(public_key_pem).await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_key_registration(status, started.elapsed());
        Ok(result?)
    }
}

/// Derive the `Origin` header (`scheme://host[:port]`) from an endpoint URL.
fn origin_header(endpoint: &Url) -> Result<String, PublishError> {
    let scheme = endpoint.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(PublishError::InvalidEndpoint(format!(
            "unsupported scheme '{scheme}'"
        )));
    }

    let host = endpoint
        .host_str()
        .ok_or_else(|| PublishError::InvalidEndpoint("missing host".to_string()))?;

    Ok(match endpoint.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    })
}
