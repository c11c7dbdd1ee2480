//! Loopback transport for the nestr key agent.
//!
//! This crate provides:
//! - JSON-RPC 2.0 over HTTP `POST /rpc` on `127.0.0.1`
//! - `StoreKey` / `RetrieveKey` / `ping` method handlers
//! - A thin client stub with a fixed request timeout

pub mod client;
pub mod error;
pub mod methods;
pub mod rpc;
pub mod server;

pub use client::KeyAgentClient;
pub use error::GatewayError;
pub use methods::{MethodHandler, MethodRegistry};
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::{Gateway, GatewayConfig, DEFAULT_PORT};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
