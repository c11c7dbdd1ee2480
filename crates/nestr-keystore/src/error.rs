//! Error types for key storage operations.

use thiserror::Error;

/// Errors surfaced by the keystore, cache, and service.
///
/// A wrong passphrase and a corrupted ciphertext both produce
/// [`KeystoreError::AuthenticationFailure`] and carry no further detail.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Authentication failed: wrong passphrase or corrupted key data")]
    AuthenticationFailure,

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}

impl From<std::io::Error> for KeystoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for KeystoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(format!("malformed keystore: {e}"))
    }
}

/// Convenience result alias for keystore operations.
pub type Result<T> = std::result::Result<T, KeystoreError>;
