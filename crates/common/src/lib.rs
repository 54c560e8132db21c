//! Common utilities shared across the token issuer workspace.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for tracing subscriber setup
pub mod observability;
