// Configuration module for sound-relay
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use loader::ConfigLoader;
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RelayConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<RelayConfig> {
    let mut config = load_config(path)?;

    // Allow environment variables to override config values
    if let Ok(host) = std::env::var("RELAY_HOST") {
        config.network.host = host;
    }

    if let Ok(port) = std::env::var("RELAY_PORT") {
        config.network.port = port
            .parse()
            .context("RELAY_PORT must be a valid port number")?;
    }

    if let Ok(base_path) = std::env::var("RELAY_RECORDING_DIR") {
        if let Some(fs_config) = config.storage.filesystem.as_mut() {
            fs_config.base_path = base_path;
        }
    }

    Ok(config)
}
