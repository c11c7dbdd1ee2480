//! Command-line flags flowing into the running service configuration.

use clap::Parser;
use nestr_cli::{Cli, Commands};
use nestr_keystore::ServiceConfig;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_run_flags_override_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json5");
    std::fs::write(
        &config_path,
        "{ gateway: { port: 6100 }, cache: { ttl_secs: 600, verify_passphrase: false } }",
    )
    .unwrap();
    let keystore = dir.path().join("override.json");

    let cli = Cli::try_parse_from([
        "nestr-key-agent",
        "--config",
        config_path.to_str().unwrap(),
        "run",
        "--keystore",
        keystore.to_str().unwrap(),
        "--ttl-secs",
        "30",
    ])
    .unwrap();

    let mut config = cli.load_config().unwrap();
    let Commands::Run(args) = cli.command else {
        panic!("Expected Run command");
    };
    args.apply(&mut config);
    config.validate().unwrap();

    assert_eq!(config.gateway.port, 6100);
    let service_config = ServiceConfig::from_config(&config).unwrap();
    assert_eq!(service_config.keystore_path, keystore);
    assert_eq!(service_config.cache_ttl, Duration::from_secs(30));
}
