//! Background tasks for the token issuer.
//!
//! # Tasks
//!
//! - `key_rotation` - Periodically replaces the active signing key

pub mod key_rotation;

pub use key_rotation::{start_key_rotation, KeyRotationConfig};
