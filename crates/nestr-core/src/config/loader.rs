//! Configuration loading and persistence.

use super::Config;
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load the default config file, falling back to defaults when it is absent.
    ///
    /// A present but unparsable file is still an error.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::load_default() {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(path)) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "loading config");
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve the keystore file, applying `~` expansion to configured paths.
    pub fn keystore_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.keystore.path {
            Some(path) => Ok(paths::expand_tilde(&path.to_string_lossy())),
            None => paths::keystore_file(),
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.gateway.port == 0 {
            errors.push("Gateway port cannot be 0".to_string());
        }

        if self.cache.ttl_secs == 0 {
            errors.push("Cache ttl_secs must be greater than 0".to_string());
        }

        if let Some(path) = &self.keystore.path {
            if path.as_os_str().is_empty() {
                errors.push("Keystore path must not be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

/// Builder for constructing configuration programmatically.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the keystore file path.
    pub fn keystore_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.keystore.path = Some(path.into());
        self
    }

    /// Set the cache TTL in seconds.
    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache.ttl_secs = secs;
        self
    }

    /// Enable or disable passphrase verification on cache hits.
    pub fn verify_passphrase(mut self, verify: bool) -> Self {
        self.config.cache.verify_passphrase = verify;
        self
    }

    /// Set the gateway port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.gateway.port = port;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_config() {
        let content = r#"{
            // json5 allows comments
            cache: { ttl_secs: 60 },
        }"#;

        let config = Config::parse(content).unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.cache.verify_passphrase);
        assert_eq!(config.gateway.port, 50051);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            Config::parse("not valid json"),
            Err(ConfigError::Json5(_))
        ));
    }

    #[test]
    fn test_load_nonexistent() {
        let result = Config::load(Path::new("/nonexistent/config.json5"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json5");

        let config = ConfigBuilder::new()
            .port(6000)
            .cache_ttl_secs(30)
            .verify_passphrase(false)
            .keystore_path("/tmp/ks.json")
            .build();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.gateway.port, 6000);
        assert_eq!(loaded.cache.ttl_secs, 30);
        assert!(!loaded.cache.verify_passphrase);
        assert_eq!(loaded.keystore.path, Some(PathBuf::from("/tmp/ks.json")));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_keystore_path_default_and_override() {
        let config = Config::default();
        assert!(config.keystore_path().unwrap().ends_with("keystore.json"));

        let config = ConfigBuilder::new().keystore_path("/srv/keys.json").build();
        assert_eq!(
            config.keystore_path().unwrap(),
            PathBuf::from("/srv/keys.json")
        );
    }

    #[test]
    fn test_validate_default_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = ConfigBuilder::new().port(0).cache_ttl_secs(0).build();
        match config.validate() {
            Err(ConfigError::Validation(msg)) => {
                assert!(msg.contains("port"));
                assert!(msg.contains("ttl_secs"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
