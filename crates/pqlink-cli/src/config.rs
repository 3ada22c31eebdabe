//! CLI configuration: parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use pqlink_core::PqNetwork;
use serde::{Deserialize, Serialize};
use std::path::Path;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PqlinkConfig {
    #[serde(default)]
    pub general: GeneralSection,

    /// PQ address settings
    #[serde(default)]
    pub address: AddressSection,

    /// Output formatting
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSection {
    /// Log level (off, error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSection {
    /// PQ address network: "mainnet" or "testnet"
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for AddressSection {
    fn default() -> Self {
        Self {
            network: default_network(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Pretty-print JSON output
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_network() -> String {
    "mainnet".to_string()
}

fn default_pretty() -> bool {
    true
}

impl PqlinkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: PqlinkConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `PQLINK_LOG_LEVEL`
    /// - `PQLINK_NETWORK`
    /// - `PQLINK_PRETTY`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PQLINK_LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Ok(v) = std::env::var("PQLINK_NETWORK") {
            self.address.network = v;
        }
        if let Ok(v) = std::env::var("PQLINK_PRETTY") {
            if let Ok(pretty) = v.parse::<bool>() {
                self.output.pretty = pretty;
            }
        }
    }

    /// Parse the configured network.
    pub fn network(&self) -> Result<PqNetwork> {
        self.address
            .network
            .parse::<PqNetwork>()
            .map_err(anyhow::Error::msg)
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            LOG_LEVELS.contains(&self.general.log_level.to_ascii_lowercase().as_str()),
            "general.log_level must be one of {:?}",
            LOG_LEVELS
        );

        self.network()
            .context("address.network must be \"mainnet\" or \"testnet\"")?;

        Ok(())
    }
}
