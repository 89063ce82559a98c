//! Training configuration parsing from environment variables.
//!
//! This module handles model storage location, history windows and the
//! gradient boosting hyperparameters.

use crate::application::ml::feature_extractor::MIN_CLOSES;
use crate::application::ml::label_builder::MIN_TRAINING_CLOSES;
use crate::application::ml::trainer::TrainerConfig;
use anyhow::{Context, Result};
use std::str::FromStr;

/// Training environment configuration
#[derive(Debug, Clone)]
pub struct TrainingEnvConfig {
    pub model_dir: String,
    pub training_window_days: usize,
    pub prediction_window_days: usize,
    pub trainer: TrainerConfig,
}

impl TrainingEnvConfig {
    pub fn from_source(var: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = TrainerConfig::default();

        let training_window_days = parse(var, "TRAINING_WINDOW_DAYS", 750usize)?;
        if training_window_days < MIN_TRAINING_CLOSES {
            anyhow::bail!(
                "TRAINING_WINDOW_DAYS must be at least {}, got {}",
                MIN_TRAINING_CLOSES,
                training_window_days
            );
        }

        let prediction_window_days = parse(var, "PREDICTION_WINDOW_DAYS", 30usize)?;
        if prediction_window_days < MIN_CLOSES {
            anyhow::bail!(
                "PREDICTION_WINDOW_DAYS must be at least {}, got {}",
                MIN_CLOSES,
                prediction_window_days
            );
        }

        let trainer = TrainerConfig {
            n_estimators: parse(var, "GBDT_N_ESTIMATORS", defaults.n_estimators)?,
            learning_rate: parse(var, "GBDT_LEARNING_RATE", defaults.learning_rate)?,
            max_depth: parse(var, "GBDT_MAX_DEPTH", defaults.max_depth)?,
            min_samples_leaf: parse(var, "GBDT_MIN_SAMPLES_LEAF", defaults.min_samples_leaf)?,
            min_samples_split: parse(var, "GBDT_MIN_SAMPLES_SPLIT", defaults.min_samples_split)?,
            validation_fraction: parse(
                var,
                "GBDT_VALIDATION_FRACTION",
                defaults.validation_fraction,
            )?,
            early_stopping_rounds: parse(
                var,
                "GBDT_EARLY_STOPPING_ROUNDS",
                defaults.early_stopping_rounds,
            )?,
            ..defaults
        };
        trainer.validate().context("Invalid GBDT_* configuration")?;

        Ok(Self {
            model_dir: var("MODEL_DIR").unwrap_or_else(|| "data/models".to_string()),
            training_window_days,
            prediction_window_days,
            trainer,
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .unwrap_or_else(|| default.to_string())
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}
