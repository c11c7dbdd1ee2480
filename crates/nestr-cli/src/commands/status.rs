//! Agent status command.

use super::keys::client_for;
use clap::Args;
use nestr_core::Config;

/// Status command arguments.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Agent port (default: from config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Probe the agent with `ping`.
pub async fn run(args: StatusArgs, config: &Config) -> anyhow::Result<()> {
    let client = client_for(args.port, config)?;

    match client.ping().await {
        Ok(info) => {
            let version = info
                .get("version")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            println!("Key agent is running at {} (version {})", client.endpoint(), version);
        }
        Err(e) => {
            println!("Key agent is not reachable at {}: {}", client.endpoint(), e);
        }
    }

    Ok(())
}
