//! Configuration management for offerbox
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use offerbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Listening for job events on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `OFFERBOX__<section>__<key>`:
//! - `OFFERBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `OFFERBOX__SELLER__WALLET_ADDRESS=0x...`
//! - `OFFERBOX__RUNTIME__CAPABILITY_TIMEOUT_SECS=300`
//!
//! The marketplace API key is only read from `OFFERBOX_API_KEY`
//! (or `LITE_AGENT_API_KEY`).
//!
//! # Configuration File
//!
//! Loaded from `config/offerbox.toml` unless `OFFERBOX_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use models::{Config, MarketplaceConfig, RuntimeConfig, SellerConfig, ServerConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, skipping environment secrets
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("offerbox.toml");
        fs::write(&config_path, "[seller]\nofferings_dir = \"my-offerings\"\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(
            config.seller.offerings_dir,
            std::path::PathBuf::from("my-offerings")
        );
    }

    #[test]
    fn test_validation_runs_after_loading() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("offerbox.toml");
        fs::write(&config_path, "[seller]\nwallet_address = \"not-a-wallet\"\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError(
                ValidationError::InvalidWalletAddress { .. }
            ))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("offerbox.toml");
        fs::write(&config_path, "[server]\nmax_event_bytes = \"lots\"\n").unwrap();

        assert!(matches!(
            Config::load_from_path(config_path),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_sample_config_parses() {
        let sample: toml::Value =
            toml::from_str(include_str!("../../config/offerbox.toml")).unwrap();
        assert!(sample.get("seller").is_some());
    }
}
