//! # Dashboard Configuration
//!
//! Every knob of the simulated session, settable from the command line, from `INVENTORY_*`
//! environment variables, or from a JSON file. Missing JSON fields take the defaults below.

use clap::Args;
use fetcher_framework::Latency;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FETCH_FAILURE_RATE: f64 = 0.2;
pub const DEFAULT_CLAIM_FAILURE_RATE: f64 = 0.0;
pub const DEFAULT_FETCH_LATENCY_MS: u64 = 250;
pub const DEFAULT_CLAIM_LATENCY_MS: u64 = 1000;
pub const DEFAULT_BUFFER_SIZE: usize = 32;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    InvalidRate { field: &'static str, value: f64 },

    #[error("buffer_size must be at least 1")]
    ZeroBuffer,

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings of the simulated inventory source and the demo session.
#[derive(Debug, Clone, PartialEq, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Probability that listing the inventory fails.
    #[arg(long, env = "INVENTORY_FETCH_FAILURE_RATE", default_value_t = DEFAULT_FETCH_FAILURE_RATE)]
    pub fetch_failure_rate: f64,

    /// Probability that a claim fails before reaching the item.
    #[arg(long, env = "INVENTORY_CLAIM_FAILURE_RATE", default_value_t = DEFAULT_CLAIM_FAILURE_RATE)]
    pub claim_failure_rate: f64,

    #[arg(long, env = "INVENTORY_FETCH_LATENCY_MS", default_value_t = DEFAULT_FETCH_LATENCY_MS)]
    pub fetch_latency_ms: u64,

    #[arg(long, env = "INVENTORY_CLAIM_LATENCY_MS", default_value_t = DEFAULT_CLAIM_LATENCY_MS)]
    pub claim_latency_ms: u64,

    /// Channel capacity of every actor.
    #[arg(long, env = "INVENTORY_BUFFER_SIZE", default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Seed for fault injection. Random when unset.
    #[arg(long, env = "INVENTORY_SEED")]
    pub seed: Option<u64>,

    /// Reload attempts the demo makes before giving up.
    #[arg(long, env = "INVENTORY_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            fetch_failure_rate: DEFAULT_FETCH_FAILURE_RATE,
            claim_failure_rate: DEFAULT_CLAIM_FAILURE_RATE,
            fetch_latency_ms: DEFAULT_FETCH_LATENCY_MS,
            claim_latency_ms: DEFAULT_CLAIM_LATENCY_MS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            seed: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl DashboardConfig {
    /// Loads a JSON config file. Absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("fetch_failure_rate", self.fetch_failure_rate)?;
        check_rate("claim_failure_rate", self.claim_failure_rate)?;
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBuffer);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }

    pub fn latency(&self) -> Latency {
        Latency::new(
            Duration::from_millis(self.fetch_latency_ms),
            Duration::from_millis(self.claim_latency_ms),
        )
    }

    /// No faults and no latency, for tests.
    pub fn reliable() -> Self {
        Self {
            fetch_failure_rate: 0.0,
            claim_failure_rate: 0.0,
            fetch_latency_ms: 0,
            claim_latency_ms: 0,
            ..Self::default()
        }
    }
}

fn check_rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: DashboardConfig,
    }

    #[test]
    fn defaults_match_the_simulated_service() {
        let config = DashboardConfig::default();
        assert_eq!(config.fetch_failure_rate, 0.2);
        assert_eq!(config.latency().action, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cli_defaults_equal_struct_defaults() {
        let cli = Cli::parse_from(["inventory-dashboard"]);
        assert_eq!(cli.config, DashboardConfig::default());
    }

    #[test]
    fn cli_flags_override() {
        let cli = Cli::parse_from([
            "inventory-dashboard",
            "--fetch-failure-rate",
            "0.5",
            "--seed",
            "7",
        ]);
        assert_eq!(cli.config.fetch_failure_rate, 0.5);
        assert_eq!(cli.config.seed, Some(7));
    }

    #[test]
    fn rejects_out_of_range_rate() {
        let config = DashboardConfig {
            claim_failure_rate: 1.5,
            ..DashboardConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate { field: "claim_failure_rate", .. })
        ));
    }

    #[test]
    fn rejects_zero_buffer() {
        let config = DashboardConfig {
            buffer_size: 0,
            ..DashboardConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBuffer)));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: DashboardConfig = serde_json::from_str(r#"{"seed": 42}"#).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }
}
