//! RPC method registry and the key agent handlers.

use crate::error::GatewayError;
use crate::Result;
use async_trait::async_trait;
use nestr_core::SecretString;
use nestr_keystore::KeyAgentService;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for RPC method handlers.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Handle the method call.
    async fn call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value>;
}

/// Registry for RPC methods.
pub struct MethodRegistry {
    methods: RwLock<HashMap<String, Arc<dyn MethodHandler>>>,
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self {
            methods: RwLock::new(HashMap::new()),
        }
    }

    /// Register a method handler, replacing any previous one.
    pub async fn register(&self, name: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        self.methods.write().await.insert(name.into(), handler);
    }

    /// Call a method.
    pub async fn call(
        &self,
        name: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let handler = self
            .methods
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::MethodNotFound(name.to_string()))?;

        debug!("Calling method: {}", name);
        handler.call(params).await
    }

    /// Registered method names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T> {
    let value = params.ok_or_else(|| GatewayError::InvalidParams("missing params".to_string()))?;
    serde_json::from_value(value).map_err(|e| GatewayError::InvalidParams(e.to_string()))
}

/// Parameters for `StoreKey`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreKeyParams {
    pub key_name: String,
    pub private_key: SecretString,
    pub passphrase: SecretString,
}

/// Parameters for `RetrieveKey`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveKeyParams {
    pub key_name: String,
    pub passphrase: SecretString,
}

/// `StoreKey`: encrypt and persist a private key.
pub struct StoreKeyHandler {
    service: Arc<KeyAgentService>,
}

impl StoreKeyHandler {
    pub fn new(service: Arc<KeyAgentService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MethodHandler for StoreKeyHandler {
    async fn call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
        let params: StoreKeyParams = parse_params(params)?;
        debug!(key_name = %params.key_name, "StoreKey request");

        self.service
            .store_key(&params.key_name, &params.private_key, &params.passphrase)
            .await?;

        Ok(serde_json::json!({ "success": true }))
    }
}

/// `RetrieveKey`: return a decrypted private key.
pub struct RetrieveKeyHandler {
    service: Arc<KeyAgentService>,
}

impl RetrieveKeyHandler {
    pub fn new(service: Arc<KeyAgentService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MethodHandler for RetrieveKeyHandler {
    async fn call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
        let params: RetrieveKeyParams = parse_params(params)?;
        debug!(key_name = %params.key_name, "RetrieveKey request");

        let private_key = self
            .service
            .retrieve_key(&params.key_name, &params.passphrase)
            .await?;

        Ok(serde_json::json!({ "privateKey": private_key.expose_secret() }))
    }
}

/// Liveness probe.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn call(&self, _params: Option<serde_json::Value>) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "pong": true,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

/// Register the key agent methods against `service`.
pub async fn register_key_agent(registry: &MethodRegistry, service: Arc<KeyAgentService>) {
    registry
        .register("StoreKey", Arc::new(StoreKeyHandler::new(service.clone())))
        .await;
    registry
        .register("RetrieveKey", Arc::new(RetrieveKeyHandler::new(service)))
        .await;
    registry.register("ping", Arc::new(PingHandler)).await;
}
