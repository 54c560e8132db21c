use thiserror::Error;

/// Errors produced by the signing key and token issuance subsystem.
///
/// `KeyGeneration` and `Registration` are fatal while the rotator is being
/// constructed and abandon the attempt (keeping the previous key) during
/// rotation. `KeyFormat` and `Signing` surface to `tokenize` callers.
#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Key registration failed: {0}")]
    Registration(String),

    #[error("Stored signing key is malformed: {0}")]
    KeyFormat(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl IssuerError {
    /// Bounded label for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            IssuerError::KeyGeneration(_) => "key_generation",
            IssuerError::Registration(_) => "registration",
            IssuerError::KeyFormat(_) => "key_format",
            IssuerError::Signing(_) => "signing",
        }
    }
}
