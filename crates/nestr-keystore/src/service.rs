//! The key agent: store and retrieve passphrase-protected private keys.

use nestr_core::{Config, ConfigError, SecretString};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CachePolicy, KeyCache, DEFAULT_TTL};
use crate::codec::{KeyCodec, Secp256k1HexCodec};
use crate::engine;
use crate::error::{KeystoreError, Result};
use crate::store::CredentialStore;
use crate::types::{EncryptedBlob, KeyMaterial};

/// Settings injected into [`KeyAgentService::start`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Keystore file location.
    pub keystore_path: PathBuf,

    /// Lifetime of decrypted keys in the cache.
    pub cache_ttl: Duration,

    /// Whether cache hits re-check the passphrase.
    pub cache_policy: CachePolicy,
}

impl ServiceConfig {
    /// Defaults for everything but the keystore location.
    pub fn new(keystore_path: impl Into<PathBuf>) -> Self {
        Self {
            keystore_path: keystore_path.into(),
            cache_ttl: DEFAULT_TTL,
            cache_policy: CachePolicy::default(),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// Build from the loaded agent configuration.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        let policy = if config.cache.verify_passphrase {
            CachePolicy::VerifyPassphrase
        } else {
            CachePolicy::Session
        };

        Ok(Self::new(config.keystore_path()?)
            .with_cache_ttl(config.cache.ttl())
            .with_cache_policy(policy))
    }
}

/// Orchestrates the engine, cache, and keystore for the two agent operations.
///
/// Constructed once at startup and shared by reference (typically behind an
/// `Arc`) with every request handler.
pub struct KeyAgentService {
    store: CredentialStore,
    cache: KeyCache,
    codec: Arc<dyn KeyCodec>,
    /// Held exclusively while a store replaces a record and drops its cache
    /// entry, and shared while a retrieve publishes freshly decrypted material.
    publish: RwLock<()>,
}

impl KeyAgentService {
    /// Assemble a service from already-built parts.
    pub fn new(store: CredentialStore, cache: KeyCache, codec: Arc<dyn KeyCodec>) -> Self {
        Self {
            store,
            cache,
            codec,
            publish: RwLock::new(()),
        }
    }

    /// Load the keystore and build a ready service with the secp256k1 hex codec.
    pub async fn start(config: ServiceConfig) -> Result<Self> {
        let store = CredentialStore::load(&config.keystore_path).await?;
        let cache = KeyCache::new(config.cache_ttl, config.cache_policy);
        info!(
            ttl_secs = config.cache_ttl.as_secs(),
            policy = ?config.cache_policy,
            "key agent ready"
        );
        Ok(Self::new(store, cache, Arc::new(Secp256k1HexCodec)))
    }

    /// Replace the key codec.
    pub fn with_codec(mut self, codec: Arc<dyn KeyCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }

    /// Encrypt `private_key` under `passphrase` and persist it as `key_name`.
    ///
    /// Replaces any existing record of the same name and drops its cached
    /// material. The cache is not populated; the first retrieve pays for
    /// decryption.
    pub async fn store_key(
        &self,
        key_name: &str,
        private_key: &SecretString,
        passphrase: &SecretString,
    ) -> Result<()> {
        validate_key_name(key_name)?;
        let material = self.codec.decode(private_key.expose_secret())?;

        let passphrase = passphrase.clone();
        let blob =
            run_blocking(move || engine::encrypt(material.expose(), passphrase.as_bytes())).await?;

        {
            let _publish = self.publish.write().await;
            self.store.store(key_name, blob).await?;
            if self.cache.evict(key_name).await {
                debug!(key_name, "dropped cached material for replaced key");
            }
        }
        info!(key_name, "stored key");
        Ok(())
    }

    /// Return the encoded private key for `key_name`.
    ///
    /// Served from the cache when possible; otherwise the record is decrypted
    /// with `passphrase` and cached for the configured TTL.
    pub async fn retrieve_key(
        &self,
        key_name: &str,
        passphrase: &SecretString,
    ) -> Result<SecretString> {
        validate_key_name(key_name)?;

        if let Some(material) = self.cache.get(key_name, passphrase.as_bytes()).await? {
            debug!(key_name, "cache hit");
            return self.codec.encode(&material);
        }

        let blob = self
            .store
            .get(key_name)
            .await
            .ok_or_else(|| KeystoreError::NotFound(key_name.to_string()))?;

        let material = decrypt_blocking(blob.clone(), passphrase.clone()).await?;
        let encoded = self.codec.encode(&material)?;

        // A store may have replaced the record while it was being decrypted.
        let _publish = self.publish.read().await;
        if self.store.get(key_name).await.as_ref() != Some(&blob) {
            debug!(key_name, "record replaced during decryption, not caching");
            return Ok(encoded);
        }
        self.cache
            .put(key_name, material, passphrase.as_bytes())
            .await?;
        debug!(key_name, "decrypted key and populated cache");
        Ok(encoded)
    }
}

fn validate_key_name(key_name: &str) -> Result<()> {
    if key_name.is_empty() {
        return Err(KeystoreError::InvalidFormat(
            "key name must not be empty".to_string(),
        ));
    }
    Ok(())
}

async fn decrypt_blocking(blob: EncryptedBlob, passphrase: SecretString) -> Result<KeyMaterial> {
    run_blocking(move || engine::decrypt(blob.as_bytes(), passphrase.as_bytes())).await
}

/// Run KDF-bound work off the async worker threads.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KeystoreError::Encryption(format!("crypto task failed: {e}")))?
}
