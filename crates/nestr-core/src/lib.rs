//! # nestr-core
//!
//! Core configuration and utilities for the nestr key agent.
//!
//! This crate provides shared functionality used across the nestr crates:
//!
//! - **Configuration**: Loading, validation, and defaults for `config.json5`
//! - **Paths**: Resolution of the per-user `~/.gitnestr` directory
//! - **Secrets**: A zeroize-on-drop string for passphrases

pub mod config;
pub mod error;
pub mod paths;
pub mod secret;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use secret::SecretString;
