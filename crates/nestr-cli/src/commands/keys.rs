//! Client-side key commands.
//!
//! `store` and `retrieve` talk to a running agent over its loopback endpoint.
//! Secrets not given as flags are prompted for with hidden input.

use clap::Args;
use nestr_core::{Config, SecretString};
use nestr_gateway::KeyAgentClient;

/// Store command arguments.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Key name
    pub name: String,

    /// Private key as 64 hex digits (if omitted, prompts for hidden input)
    #[arg(long)]
    pub private_key: Option<String>,

    /// Passphrase (if omitted, prompts for hidden input)
    #[arg(long)]
    pub passphrase: Option<String>,

    /// Agent port (default: from config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Retrieve command arguments.
#[derive(Args, Debug)]
pub struct RetrieveArgs {
    /// Key name
    pub name: String,

    /// Passphrase (if omitted, prompts for hidden input)
    #[arg(long)]
    pub passphrase: Option<String>,

    /// Agent port (default: from config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub(crate) fn client_for(port: Option<u16>, config: &Config) -> anyhow::Result<KeyAgentClient> {
    Ok(KeyAgentClient::for_port(port.unwrap_or(config.gateway.port))?)
}

fn prompt_secret(prompt: &str) -> anyhow::Result<SecretString> {
    let value = rpassword::prompt_password(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to read input: {}", e))?;
    Ok(SecretString::new(value))
}

fn secret_or_prompt(value: Option<String>, prompt: &str) -> anyhow::Result<SecretString> {
    match value {
        Some(v) => Ok(SecretString::new(v)),
        None => prompt_secret(prompt),
    }
}

/// Store a key in the running agent.
pub async fn store(args: StoreArgs, config: &Config) -> anyhow::Result<()> {
    let private_key = secret_or_prompt(args.private_key, "Private key: ")?;

    let passphrase = match args.passphrase {
        Some(v) => SecretString::new(v),
        None => {
            let first = prompt_secret("Passphrase: ")?;
            let second = prompt_secret("Confirm passphrase: ")?;
            if first != second {
                anyhow::bail!("Passphrases do not match");
            }
            first
        }
    };

    if passphrase.is_empty() {
        anyhow::bail!("Passphrase must not be empty");
    }

    let client = client_for(args.port, config)?;
    client.store_key(&args.name, &private_key, &passphrase).await?;

    println!("Key '{}' stored.", args.name);
    Ok(())
}

/// Retrieve a key from the running agent and print it.
pub async fn retrieve(args: RetrieveArgs, config: &Config) -> anyhow::Result<()> {
    let passphrase = secret_or_prompt(args.passphrase, "Passphrase: ")?;

    let client = client_for(args.port, config)?;
    let private_key = client.retrieve_key(&args.name, &passphrase).await?;

    println!("{}", private_key.expose_secret());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_port_defaults_to_config() {
        let mut config = Config::default();
        config.gateway.port = 6500;

        let client = client_for(None, &config).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:6500");

        let client = client_for(Some(7000), &config).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:7000");
    }

    #[test]
    fn test_flag_values_skip_prompt() {
        let secret = secret_or_prompt(Some("hunter2".into()), "unused: ").unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");
    }
}
