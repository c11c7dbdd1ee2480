//! Client to agent over a real loopback socket.

use nestr_core::SecretString;
use nestr_gateway::GatewayError;
use nestr_integration_tests::{keystore_path, RunningAgent, TEST_KEY};
use nestr_keystore::{CachePolicy, ServiceConfig};
use tempfile::TempDir;

fn secret(s: &str) -> SecretString {
    SecretString::new(s)
}

#[tokio::test]
async fn test_store_and_retrieve_over_socket() {
    let home = TempDir::new().unwrap();
    let agent = RunningAgent::start(ServiceConfig::new(keystore_path(home.path()))).await;

    let pong = agent.client.ping().await.unwrap();
    assert_eq!(pong["pong"], true);

    agent
        .client
        .store_key("alice", &secret(TEST_KEY), &secret("correctpass"))
        .await
        .unwrap();

    let key = agent
        .client
        .retrieve_key("alice", &secret("correctpass"))
        .await
        .unwrap();
    assert_eq!(key.expose_secret(), TEST_KEY);

    agent.stop().await;
}

#[tokio::test]
async fn test_error_kinds_survive_the_wire() {
    let home = TempDir::new().unwrap();
    let agent = RunningAgent::start(ServiceConfig::new(keystore_path(home.path()))).await;

    let missing = agent.client.retrieve_key("bob", &secret("x")).await;
    assert!(matches!(missing, Err(GatewayError::Remote { code: -32002, .. })));

    let invalid = agent
        .client
        .store_key("alice", &secret("not-hex"), &secret("pw"))
        .await;
    assert!(matches!(invalid, Err(GatewayError::Remote { code: -32602, .. })));

    let empty_name = agent
        .client
        .store_key("", &secret(TEST_KEY), &secret("pw"))
        .await;
    assert!(matches!(empty_name, Err(GatewayError::Remote { code: -32602, .. })));

    agent
        .client
        .store_key("alice", &secret(TEST_KEY), &secret("pw"))
        .await
        .unwrap();
    let wrong = agent.client.retrieve_key("alice", &secret("nope")).await;
    assert!(matches!(wrong, Err(GatewayError::Remote { code: -32001, .. })));

    agent.stop().await;
}

#[tokio::test]
async fn test_cached_key_requires_matching_passphrase() {
    let home = TempDir::new().unwrap();
    let config = ServiceConfig::new(keystore_path(home.path()))
        .with_cache_policy(CachePolicy::VerifyPassphrase);
    let agent = RunningAgent::start(config).await;

    agent
        .client
        .store_key("alice", &secret(TEST_KEY), &secret("pw"))
        .await
        .unwrap();
    agent.client.retrieve_key("alice", &secret("pw")).await.unwrap();

    let wrong = agent.client.retrieve_key("alice", &secret("other")).await;
    assert!(matches!(wrong, Err(GatewayError::Remote { code: -32001, .. })));

    agent.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients() {
    let home = TempDir::new().unwrap();
    let agent = RunningAgent::start(ServiceConfig::new(keystore_path(home.path()))).await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let client = agent.client.clone();
        handles.push(tokio::spawn(async move {
            let name = format!("key-{i}");
            client
                .store_key(&name, &secret(TEST_KEY), &secret("pw"))
                .await?;
            client.retrieve_key(&name, &secret("pw")).await
        }));
    }
    for handle in handles {
        let key = handle.await.unwrap().unwrap();
        assert_eq!(key.expose_secret(), TEST_KEY);
    }

    agent.stop().await;
}
