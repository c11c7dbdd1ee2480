//! Gateway error types.

use nestr_keystore::KeystoreError;
use thiserror::Error;

/// Errors that can occur in the gateway or its client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Method not found.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters, including malformed keys and names.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Passphrase did not authenticate the record.
    #[error("Authentication failed")]
    Auth,

    /// No record under the requested name.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The keystore file could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// HTTP transport failure in the client.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Error returned by the remote agent.
    #[error("Remote error {code}: {message}")]
    Remote { code: i32, message: String },
}

impl GatewayError {
    /// Get the JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Json(_) => -32700,
            Self::Auth => -32001,
            Self::NotFound(_) => -32002,
            Self::Remote { code, .. } => *code,
            _ => -32603,
        }
    }
}

impl From<KeystoreError> for GatewayError {
    fn from(err: KeystoreError) -> Self {
        match err {
            KeystoreError::InvalidFormat(msg) => Self::InvalidParams(msg),
            KeystoreError::AuthenticationFailure => Self::Auth,
            KeystoreError::NotFound(name) => Self::NotFound(name),
            KeystoreError::Persistence(msg) => Self::Persistence(msg),
            KeystoreError::Encryption(msg) => Self::Internal(msg),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keystore_errors_map_to_distinct_codes() {
        let cases = [
            (KeystoreError::InvalidFormat("bad".into()), -32602),
            (KeystoreError::AuthenticationFailure, -32001),
            (KeystoreError::NotFound("bob".into()), -32002),
            (KeystoreError::Persistence("disk".into()), -32603),
        ];

        for (err, code) in cases {
            assert_eq!(GatewayError::from(err).code(), code);
        }
    }

    #[test]
    fn test_remote_error_keeps_code() {
        let err = GatewayError::Remote {
            code: -32002,
            message: "Key not found: bob".into(),
        };
        assert_eq!(err.code(), -32002);
        assert!(err.to_string().contains("bob"));
    }
}
