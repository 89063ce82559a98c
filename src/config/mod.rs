//! Configuration module for Trendcast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: price-data providers and training.

mod provider_config;
mod training_config;

pub use provider_config::{ProviderEnvConfig, TiingoConfig};
pub use training_config::TrainingEnvConfig;

use crate::application::ml::model_store::ModelStoreConfig;
use crate::application::ml::trainer::TrainerConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where daily closes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Mock,
    Tiingo,
    Csv,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "tiingo" => Ok(Mode::Tiingo),
            "csv" => Ok(Mode::Csv),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock', 'tiingo', or 'csv'", s),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,

    // Providers (from ProviderEnvConfig)
    pub tiingo_api_key: String,
    pub tiingo_base_url: String,
    pub csv_data_dir: PathBuf,
    pub provider_timeout: Duration,

    // Training (from TrainingEnvConfig)
    pub model_dir: PathBuf,
    pub training_window_days: usize,
    pub prediction_window_days: usize,
    pub trainer: TrainerConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&|key: &str| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_source(var: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mode_str = var("MODE").unwrap_or_else(|| "mock".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let provider =
            ProviderEnvConfig::from_source(var).context("Failed to load provider config")?;
        let training =
            TrainingEnvConfig::from_source(var).context("Failed to load training config")?;

        if mode == Mode::Tiingo && provider.tiingo.api_key.is_empty() {
            anyhow::bail!("TIINGO_API_KEY is required when MODE=tiingo");
        }

        Ok(Self {
            mode,

            // Providers
            tiingo_api_key: provider.tiingo.api_key,
            tiingo_base_url: provider.tiingo.base_url,
            csv_data_dir: PathBuf::from(provider.csv_data_dir),
            provider_timeout: provider.timeout,

            // Training
            model_dir: PathBuf::from(training.model_dir),
            training_window_days: training.training_window_days,
            prediction_window_days: training.prediction_window_days,
            trainer: training.trainer,
        })
    }

    /// Create the ModelStore settings from this Config
    pub fn to_store_config(&self) -> ModelStoreConfig {
        ModelStoreConfig {
            training_window: self.training_window_days,
            provider_timeout: self.provider_timeout,
        }
    }
}
