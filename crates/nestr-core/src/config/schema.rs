//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main key agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Durable keystore settings.
    #[serde(default)]
    pub keystore: KeystoreConfig,

    /// Decrypted-key cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Local RPC endpoint settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Keystore configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeystoreConfig {
    /// Keystore file location. Defaults to `~/.gitnestr/keystore.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Cache configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a decrypted key in the cache, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Re-check the passphrase on every cache hit.
    #[serde(default = "default_true")]
    pub verify_passphrase: bool,
}

impl CacheConfig {
    /// The TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            verify_passphrase: true,
        }
    }
}

/// Gateway configuration section.
///
/// The endpoint always binds to loopback; only the port is configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// 72 hours.
fn default_cache_ttl_secs() -> u64 {
    72 * 60 * 60
}

fn default_port() -> u16 {
    50051
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
