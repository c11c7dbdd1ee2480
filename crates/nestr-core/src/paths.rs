//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Name of the per-user directory holding agent state.
pub const BASE_DIR_NAME: &str = ".gitnestr";

/// Get the agent base directory (~/.gitnestr).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(BASE_DIR_NAME))
}

/// Get the main config file path (~/.gitnestr/config.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("config.json5"))
}

/// Get the keystore file path (~/.gitnestr/keystore.json).
pub fn keystore_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("keystore.json"))
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
