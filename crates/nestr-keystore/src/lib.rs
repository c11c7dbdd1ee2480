//! Passphrase-encrypted private key storage for the nestr key agent.
//!
//! Private keys are encrypted with AES-256-GCM under a key derived from the
//! caller's passphrase with scrypt, persisted to a single JSON keystore file,
//! and cached in memory after the first successful decryption for a fixed TTL.
//!
//! [`KeyAgentService`] ties the pieces together:
//!
//! - [`engine`]: stateless encrypt/decrypt transform
//! - [`cache`]: decrypted keys with time-based expiry
//! - [`store`]: the durable keystore file
//! - [`codec`]: text encoding of raw key material

pub mod cache;
pub mod codec;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;
pub mod types;

pub use cache::{CachePolicy, KeyCache};
pub use codec::{KeyCodec, Secp256k1HexCodec};
pub use error::{KeystoreError, Result};
pub use service::{KeyAgentService, ServiceConfig};
pub use store::{CredentialStore, Keystore};
pub use types::{EncryptedBlob, KeyMaterial};
