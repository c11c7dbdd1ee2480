//! nestr key agent entry point.

use clap::Parser;
use nestr_cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // RUST_LOG wins; otherwise the configured level, raised by -v.
    let default_filter = match cli.verbose {
        0 => format!("nestr={}", config.logging.level),
        1 => "nestr=debug".to_string(),
        _ => "nestr=trace,tower_http=debug".to_string(),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    run(cli, config).await
}
