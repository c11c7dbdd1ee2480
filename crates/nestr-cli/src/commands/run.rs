//! Foreground agent command.

use anyhow::Context;
use clap::Args;
use nestr_core::Config;
use nestr_gateway::{Gateway, GatewayConfig};
use nestr_keystore::{KeyAgentService, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Run command arguments. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Keystore file
    #[arg(long)]
    pub keystore: Option<PathBuf>,

    /// Loopback port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Cache lifetime of decrypted keys, in seconds
    #[arg(long)]
    pub ttl_secs: Option<u64>,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.keystore {
            config.keystore.path = Some(path.clone());
        }
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if let Some(ttl) = self.ttl_secs {
            config.cache.ttl_secs = ttl;
        }
    }
}

/// Load the keystore and serve until interrupted.
pub async fn run(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let service_config = ServiceConfig::from_config(&config)?;
    let keystore_path = service_config.keystore_path.clone();
    let service = KeyAgentService::start(service_config)
        .await
        .with_context(|| format!("failed to load keystore {}", keystore_path.display()))?;

    let gateway =
        Gateway::with_service(GatewayConfig::from_config(&config), Arc::new(service)).await;
    gateway.run(shutdown_signal()).await?;

    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping key agent");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = Config::default();
        let args = RunArgs {
            keystore: Some(PathBuf::from("/tmp/ks.json")),
            port: Some(6001),
            ttl_secs: Some(15),
        };
        args.apply(&mut config);

        assert_eq!(config.keystore.path, Some(PathBuf::from("/tmp/ks.json")));
        assert_eq!(config.gateway.port, 6001);
        assert_eq!(config.cache.ttl_secs, 15);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Config::default();
        RunArgs::default().apply(&mut config);

        assert!(config.keystore.path.is_none());
        assert_eq!(config.gateway.port, 50051);
        assert_eq!(config.cache.ttl_secs, 72 * 60 * 60);
    }

    #[tokio::test]
    async fn test_invalid_override_is_rejected_before_start() {
        let args = RunArgs {
            ttl_secs: Some(0),
            ..Default::default()
        };
        let result = run(args, Config::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_keystore_aborts_startup() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("keystore.json");
        std::fs::write(&path, "not json").unwrap();

        let args = RunArgs {
            keystore: Some(path),
            ..Default::default()
        };
        let err = run(args, Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("failed to load keystore"));
    }
}
