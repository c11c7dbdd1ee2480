//! HTTP gateway server.

use crate::error::GatewayError;
use crate::methods::{register_key_agent, MethodRegistry};
use crate::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::Result;
use axum::{
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use nestr_keystore::KeyAgentService;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 50051;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Port number on the loopback interface.
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl GatewayConfig {
    pub fn from_config(config: &nestr_core::Config) -> Self {
        Self {
            port: config.gateway.port,
        }
    }
}

/// Gateway server state.
pub struct GatewayState {
    /// Method registry.
    pub methods: Arc<MethodRegistry>,
}

/// The loopback JSON-RPC gateway.
pub struct Gateway {
    config: GatewayConfig,
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a gateway with an empty method registry.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            state: Arc::new(GatewayState {
                methods: Arc::new(MethodRegistry::new()),
            }),
        }
    }

    /// Create a gateway serving the key agent methods.
    pub async fn with_service(config: GatewayConfig, service: Arc<KeyAgentService>) -> Self {
        let gateway = Self::new(config);
        register_key_agent(&gateway.state.methods, service).await;
        gateway
    }

    /// Get the method registry for registering handlers.
    pub fn methods(&self) -> &Arc<MethodRegistry> {
        &self.state.methods
    }

    /// The loopback address this gateway binds. Never a wildcard address.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.config.port))
    }

    /// Create the Axum router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/rpc", post(rpc_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the loopback address and serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.bind_address();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(GatewayError::Io)?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: tokio::net::TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!("Key agent listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        info!("Key agent stopped");
        Ok(())
    }
}

/// Dispatch a single JSON-RPC request.
async fn rpc_handler(State(state): State<Arc<GatewayState>>, body: Bytes) -> Json<JsonRpcResponse> {
    Json(handle_message(&body, &state).await)
}

async fn handle_message(body: &[u8], state: &GatewayState) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => return JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string())),
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return JsonRpcResponse::error(
            request.id,
            JsonRpcError::invalid_request(format!(
                "unsupported jsonrpc version: {}",
                request.jsonrpc
            )),
        );
    }

    debug!("Received RPC request: {}", request.method);

    match state.methods.call(&request.method, request.params).await {
        Ok(value) => JsonRpcResponse::success(request.id, value),
        Err(e) => {
            debug!(method = %request.method, code = e.code(), "RPC request failed: {}", e);
            JsonRpcResponse::error(request.id, JsonRpcError::from(&e))
        }
    }
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
