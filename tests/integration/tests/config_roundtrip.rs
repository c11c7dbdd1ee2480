//! Config file to running service integration tests.

use nestr_core::config::Config;
use nestr_keystore::{CachePolicy, KeyAgentService, ServiceConfig};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json5");

    let mut config = Config::default();
    config.gateway.port = 6060;
    config.cache.ttl_secs = 120;
    config.cache.verify_passphrase = false;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.port, 6060);
    assert_eq!(loaded.cache.ttl_secs, 120);
    assert!(!loaded.cache.verify_passphrase);
}

#[test]
fn test_json5_file_drives_service_config() {
    let dir = TempDir::new().unwrap();
    let keystore = dir.path().join("keys.json");
    let source = format!(
        r#"{{
            // hand-written config
            keystore: {{ path: "{}" }},
            cache: {{ ttl_secs: 45 }},
        }}"#,
        keystore.display()
    );

    let config = Config::parse(&source).unwrap();
    config.validate().unwrap();

    let service_config = ServiceConfig::from_config(&config).unwrap();
    assert_eq!(service_config.keystore_path, keystore);
    assert_eq!(service_config.cache_ttl, Duration::from_secs(45));
    assert_eq!(service_config.cache_policy, CachePolicy::VerifyPassphrase);
}

#[tokio::test]
async fn test_service_starts_from_default_config_with_override() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.keystore.path = Some(dir.path().join("keystore.json"));

    let service = KeyAgentService::start(ServiceConfig::from_config(&config).unwrap())
        .await
        .unwrap();
    assert!(service.store().is_empty().await);
    assert_eq!(service.cache().ttl(), Duration::from_secs(72 * 60 * 60));
}
