//! # Issuer Test Utilities
//!
//! Shared test utilities for the token issuer.
//!
//! This crate provides:
//! - Scripted key registrars (`SequencedRegistrar`, `FailingRegistrar`)
//! - Cached RSA key fixtures and a static `SigningKeySource`
//! - Server test harness (`TestIssuerServer` for E2E tests)
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use issuer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let registrar = Arc::new(SequencedRegistrar::new());
//!     let rotator = KeyRotator::new(registrar.clone()).await?;
//!
//!     let token = Tokenizer::new(Arc::new(rotator)).tokenize(&Claims::new())?;
//!
//!     token.assert_valid_jwt()
//!          .assert_signed_by("key_1");
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod registrars;
pub mod server_harness;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
pub use registrars::*;
pub use server_harness::*;
