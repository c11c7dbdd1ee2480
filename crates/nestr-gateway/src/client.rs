//! Client stub for talking to a running key agent.

use crate::error::GatewayError;
use crate::rpc::{JsonRpcRequest, JsonRpcResponse};
use crate::server::DEFAULT_PORT;
use crate::Result;
use nestr_core::SecretString;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-RPC client for the key agent's loopback endpoint.
#[derive(Debug, Clone)]
pub struct KeyAgentClient {
    endpoint: String,
    http: reqwest::Client,
}

impl KeyAgentClient {
    /// Create a client for `endpoint`, e.g. `http://127.0.0.1:50051`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Ok(Self { endpoint, http })
    }

    /// Client for the agent on the local loopback at `port`.
    pub fn for_port(port: u16) -> Result<Self> {
        Self::new(format!("http://127.0.0.1:{port}"))
    }

    /// Client for the agent on the default local port.
    pub fn default_local() -> Result<Self> {
        Self::for_port(DEFAULT_PORT)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue a raw JSON-RPC call and return its result.
    pub async fn call(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let mut request = JsonRpcRequest::new(method);
        if let Some(params) = params {
            request = request.with_params(params);
        }

        debug!(method, endpoint = %self.endpoint, "sending RPC request");
        let response: JsonRpcResponse = self
            .http
            .post(format!("{}/rpc", self.endpoint))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_result()
    }

    /// Store `private_key` under `key_name`, encrypted with `passphrase`.
    pub async fn store_key(
        &self,
        key_name: &str,
        private_key: &SecretString,
        passphrase: &SecretString,
    ) -> Result<()> {
        let result = self
            .call(
                "StoreKey",
                Some(serde_json::json!({
                    "keyName": key_name,
                    "privateKey": private_key.expose_secret(),
                    "passphrase": passphrase.expose_secret(),
                })),
            )
            .await?;

        if result.get("success").and_then(|v| v.as_bool()) != Some(true) {
            return Err(GatewayError::Internal(format!(
                "agent did not confirm storing key '{key_name}'"
            )));
        }
        Ok(())
    }

    /// Retrieve the private key stored under `key_name`.
    pub async fn retrieve_key(
        &self,
        key_name: &str,
        passphrase: &SecretString,
    ) -> Result<SecretString> {
        let result = self
            .call(
                "RetrieveKey",
                Some(serde_json::json!({
                    "keyName": key_name,
                    "passphrase": passphrase.expose_secret(),
                })),
            )
            .await?;

        result
            .get("privateKey")
            .and_then(|v| v.as_str())
            .map(SecretString::new)
            .ok_or_else(|| GatewayError::Internal("response is missing privateKey".to_string()))
    }

    /// Liveness probe.
    pub async fn ping(&self) -> Result<serde_json::Value> {
        self.call("ping", None).await
    }
}
