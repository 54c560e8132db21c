//! Token Issuer Service Library
//!
//! Rotating RSA signing keys registered with an external key management
//! service, and RS256 bearer token issuance bound to the active key.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `container` - Mutex-guarded single-slot holder
//! - `crypto` - Key pair generation and key types
//! - `errors` - Error types
//! - `handlers` / `routes` - Health and metrics endpoints
//! - `services` - Key rotation, registration and token issuance
//! - `tasks` - Background key rotation
//! - `startup` - Process assembly

pub mod config;
pub mod container;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod startup;
pub mod tasks;
