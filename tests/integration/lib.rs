//! Shared helpers for the integration tests.

use nestr_gateway::{Gateway, GatewayConfig, KeyAgentClient};
use nestr_keystore::{KeyAgentService, ServiceConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A valid secp256k1 secret key used across tests.
pub const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// Keystore location inside a temp home, mirroring `~/.gitnestr/keystore.json`.
pub fn keystore_path(home: &Path) -> PathBuf {
    home.join(".gitnestr").join("keystore.json")
}

/// A key agent serving on an ephemeral loopback port.
pub struct RunningAgent {
    pub client: KeyAgentClient,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<nestr_gateway::Result<()>>,
}

impl RunningAgent {
    /// Start an agent for `config` on a fresh loopback port.
    pub async fn start(config: ServiceConfig) -> Self {
        let service = Arc::new(KeyAgentService::start(config).await.unwrap());
        let gateway = Gateway::with_service(GatewayConfig::default(), service).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            gateway
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        Self {
            client: KeyAgentClient::for_port(port).unwrap(),
            shutdown: Some(tx),
            handle,
        }
    }

    /// Signal graceful shutdown and wait for the server to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}
