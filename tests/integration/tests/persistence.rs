//! Durability of stored keys across agent restarts.

use nestr_core::SecretString;
use nestr_integration_tests::{keystore_path, TEST_KEY};
use nestr_keystore::{KeyAgentService, KeystoreError, ServiceConfig};
use tempfile::TempDir;

fn secret(s: &str) -> SecretString {
    SecretString::new(s)
}

#[tokio::test]
async fn test_key_survives_restart() {
    let home = TempDir::new().unwrap();
    let path = keystore_path(home.path());

    {
        let agent = KeyAgentService::start(ServiceConfig::new(&path)).await.unwrap();
        agent
            .store_key("alice", &secret(TEST_KEY), &secret("correctpass"))
            .await
            .unwrap();
    }

    // A new process: empty cache, keystore read back from disk.
    let agent = KeyAgentService::start(ServiceConfig::new(&path)).await.unwrap();
    assert!(agent.cache().is_empty().await);

    let key = agent
        .retrieve_key("alice", &secret("correctpass"))
        .await
        .unwrap();
    assert_eq!(key.expose_secret(), TEST_KEY);

    let wrong = agent.retrieve_key("alice", &secret("wrongpass")).await;
    assert!(matches!(wrong, Err(KeystoreError::AuthenticationFailure)));
}

#[tokio::test]
async fn test_overwrite_is_durable() {
    let home = TempDir::new().unwrap();
    let path = keystore_path(home.path());
    let replacement = "0000000000000000000000000000000000000000000000000000000000000001";

    {
        let agent = KeyAgentService::start(ServiceConfig::new(&path)).await.unwrap();
        agent
            .store_key("alice", &secret(TEST_KEY), &secret("first"))
            .await
            .unwrap();
        agent
            .store_key("alice", &secret(replacement), &secret("second"))
            .await
            .unwrap();
    }

    let agent = KeyAgentService::start(ServiceConfig::new(&path)).await.unwrap();
    assert_eq!(agent.store().len().await, 1);

    let stale = agent.retrieve_key("alice", &secret("first")).await;
    assert!(matches!(stale, Err(KeystoreError::AuthenticationFailure)));

    let key = agent.retrieve_key("alice", &secret("second")).await.unwrap();
    assert_eq!(key.expose_secret(), replacement);
}

#[tokio::test]
async fn test_keystore_file_is_name_to_base64_json() {
    let home = TempDir::new().unwrap();
    let path = keystore_path(home.path());

    let agent = KeyAgentService::start(ServiceConfig::new(&path)).await.unwrap();
    agent
        .store_key("alice", &secret(TEST_KEY), &secret("pw"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 1);

    // 8 salt + 12 nonce + 32 key + 16 tag = 68 bytes = 92 base64 chars.
    let encoded = object["alice"].as_str().unwrap();
    assert_eq!(encoded.len(), 92);
    assert!(!raw.contains(TEST_KEY));
}

#[tokio::test]
async fn test_corrupt_keystore_aborts_start() {
    let home = TempDir::new().unwrap();
    let path = keystore_path(home.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"alice": "!!not base64!!"}"#).unwrap();

    let result = KeyAgentService::start(ServiceConfig::new(&path)).await;
    assert!(matches!(result, Err(KeystoreError::Persistence(_))));
}
