//! nestr key agent command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use nestr_core::Config;
use std::path::PathBuf;

/// nestr key agent - local passphrase-protected key custody
#[derive(Parser)]
#[command(name = "nestr-key-agent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: ~/.gitnestr/config.json5)
    #[arg(short, long, env = "NESTR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Load the config file named by `--config`, or the default one.
    ///
    /// A missing default file yields defaults; an explicitly named file
    /// must exist.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default()?,
        };
        Ok(config)
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the key agent in the foreground
    Run(commands::run::RunArgs),

    /// Install the agent as a per-user OS service
    Install,

    /// Remove the per-user OS service definition
    Remove,

    /// Check whether the agent is reachable
    Status(commands::status::StatusArgs),

    /// Store a private key in the running agent
    Store(commands::keys::StoreArgs),

    /// Retrieve a private key from the running agent
    Retrieve(commands::keys::RetrieveArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => commands::run::run(args, config).await,
        Commands::Install => commands::service::install(),
        Commands::Remove => commands::service::remove(),
        Commands::Status(args) => commands::status::run(args, &config).await,
        Commands::Store(args) => commands::keys::store(args, &config).await,
        Commands::Retrieve(args) => commands::keys::retrieve(args, &config).await,
        Commands::Version => {
            println!("nestr-key-agent {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
