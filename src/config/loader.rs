// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RelayConfig> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        // Substitute environment variables
        let content = Self::substitute_env_vars(&content);

        // Parse YAML
        let config: RelayConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

        // Validate configuration
        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${RELAY_HOST:-127.0.0.1} -> 127.0.0.1 (if RELAY_HOST not set)
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if let Some(default) = default_value {
                        default.to_string()
                    } else {
                        // Keep original if no default and var not found
                        format!("${{{}}}", var_name)
                    }
                }
            }
        })
        .to_string()
    }

    /// Validate configuration
    fn validate(config: &RelayConfig) -> Result<()> {
        if config.client.capture_period_seconds == 0 {
            bail!("client.capture_period_seconds must be > 0");
        }

        if config.client.capture_length_seconds == 0 {
            bail!("client.capture_length_seconds must be > 0");
        }

        if config.client.workers == 0 {
            bail!("client.workers must be > 0");
        }

        if config.server.persist_workers == 0 {
            bail!("server.persist_workers must be > 0");
        }

        if config.server.queue_capacity == 0 {
            bail!("server.queue_capacity must be > 0");
        }

        if config.network.host.is_empty() {
            bail!("network.host cannot be empty");
        }

        // Validate sink selection
        match config.storage.backend.as_str() {
            "filesystem" => {
                if config.storage.filesystem.is_none() {
                    bail!("filesystem sink selected but filesystem config missing");
                }
            }
            "memory" => {}
            unknown => bail!(
                "Unknown persistence sink: '{}'. Supported: filesystem, memory",
                unknown
            ),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RELAY_TEST_VAR", "test_value");

        let input = "host: ${RELAY_TEST_VAR}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "host: test_value");

        std::env::remove_var("RELAY_TEST_VAR");
    }

    #[test]
    fn test_env_var_with_default() {
        std::env::remove_var("RELAY_TEST_VAR2");

        let input = "host: ${RELAY_TEST_VAR2:-10.0.0.1}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "host: 10.0.0.1");
    }

    #[test]
    fn test_validation_zero_period() {
        let mut config = RelayConfig::default();
        config.client.capture_period_seconds = 0;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("capture_period_seconds"));
    }

    #[test]
    fn test_validation_zero_workers() {
        let mut config = RelayConfig::default();
        config.client.workers = 0;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("client.workers"));
    }

    #[test]
    fn test_validation_unknown_sink() {
        let mut config = RelayConfig::default();
        config.storage.backend = "tape".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown persistence sink"));
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RelayConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());
        assert_eq!(config.network.addr(), "127.0.0.1:19000");
        assert_eq!(config.network.magic, 0x1234);
        assert_eq!(config.client.capture_period_seconds, 2);
        assert_eq!(config.client.capture_length_seconds, 4);
        assert_eq!(config.client.workers, 10);
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
network:
  host: 10.1.2.3
  port: 19500
client:
  capture_period_seconds: 1
  capture_length_seconds: 3
  format: pcm44100_16_stereo_le
storage:
  backend: memory
"#;
        let config: RelayConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.network.addr(), "10.1.2.3:19500");
        assert_eq!(config.client.capture_length_seconds, 3);
        assert_eq!(
            config.client.format,
            crate::protocol::AudioFormat::Pcm44100_16StereoLe
        );
        assert_eq!(config.storage.backend, "memory");
        // Untouched sections keep their defaults
        assert_eq!(config.server.persist_workers, 4);
        assert!(ConfigLoader::validate(&config).is_ok());
    }
}
