//! Price-data provider configuration parsing from environment variables.
//!
//! Covers the Tiingo REST client, the CSV directory source and the timeout
//! applied to every provider call.

use anyhow::{Context, Result};
use std::time::Duration;

/// Tiingo API configuration
#[derive(Debug, Clone, Default)]
pub struct TiingoConfig {
    pub api_key: String,
    pub base_url: String,
}

impl TiingoConfig {
    pub fn from_source(var: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: var("TIINGO_API_KEY").unwrap_or_default(),
            base_url: var("TIINGO_BASE_URL")
                .unwrap_or_else(|| "https://api.tiingo.com".to_string()),
        }
    }
}

/// Aggregated provider configuration
#[derive(Debug, Clone)]
pub struct ProviderEnvConfig {
    pub tiingo: TiingoConfig,
    pub csv_data_dir: String,
    pub timeout: Duration,
}

impl ProviderEnvConfig {
    pub fn from_source(var: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let timeout_secs = var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()
            .context("Failed to parse PROVIDER_TIMEOUT_SECS")?;
        if timeout_secs == 0 {
            anyhow::bail!("PROVIDER_TIMEOUT_SECS must be at least 1");
        }

        Ok(Self {
            tiingo: TiingoConfig::from_source(var),
            csv_data_dir: var("CSV_DATA_DIR").unwrap_or_else(|| "data/prices".to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
