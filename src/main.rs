//! Trendcast CLI - next-day direction forecasts per ticker
//!
//! Models are trained on first use and persisted under `MODEL_DIR`.
//! Results are printed to stdout as JSON; logs go to stderr.
//!
//! # Usage
//! ```sh
//! trendcast predict --ticker AAPL
//! trendcast predict --ticker AAPL --closes 100,101,100,102,103,104,103,105,106,107,108
//! trendcast train --ticker AAPL --ticker MSFT --force
//! trendcast info --ticker AAPL
//! trendcast features
//! ```
//!
//! # Environment Variables
//! - `MODE` - `mock`, `tiingo` or `csv` (default: mock)
//! - `TIINGO_API_KEY` - required when `MODE=tiingo`
//! - `MODEL_DIR` - model artifact directory (default: data/models)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;
use trendcast::application::forecast_service::ForecastService;
use trendcast::application::ml::model_store::ModelStore;
use trendcast::application::ml::trainer::GradientBoostingTrainer;
use trendcast::config::{Config, Mode};
use trendcast::domain::ports::ClosesProvider;
use trendcast::infrastructure::{
    CsvClosesProvider, FileModelRepository, MockClosesProvider, TiingoClosesProvider,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forecast the next-day direction, training the model if needed
    Predict {
        #[arg(long)]
        ticker: String,

        /// Comma-separated closes, oldest first (at least 11). Defaults to the
        /// provider's most recent PREDICTION_WINDOW_DAYS closes.
        #[arg(long, value_delimiter = ',')]
        closes: Option<Vec<f64>>,
    },
    /// Train (or load) models for one or more tickers
    Train {
        #[arg(long, required = true)]
        ticker: Vec<String>,

        /// Retrain even if a model already exists
        #[arg(long)]
        force: bool,
    },
    /// Show metadata and expected features of a ticker's model
    Info {
        #[arg(long)]
        ticker: String,
    },
    /// List the feature names in model input order
    Features,
}

fn build_provider(config: &Config) -> Arc<dyn ClosesProvider> {
    match config.mode {
        Mode::Mock => Arc::new(MockClosesProvider::new()),
        Mode::Tiingo => Arc::new(TiingoClosesProvider::new(
            config.tiingo_api_key.clone(),
            config.tiingo_base_url.clone(),
            config.provider_timeout,
        )),
        Mode::Csv => Arc::new(CsvClosesProvider::new(&config.csv_data_dir)),
    }
}

fn build_service(config: &Config) -> Result<ForecastService> {
    let repository = FileModelRepository::new(&config.model_dir)
        .context("Failed to open model repository")?;
    let trainer = GradientBoostingTrainer::new(config.trainer.clone());
    let store = ModelStore::new(
        Arc::new(repository),
        Arc::new(trainer),
        config.to_store_config(),
    );

    Ok(ForecastService::new(
        Arc::new(store),
        build_provider(config),
        config.prediction_window_days,
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs on stderr so stdout carries only the JSON result
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    if let Command::Features = args.command {
        return print_json(&ForecastService::feature_names());
    }

    let config = Config::from_env()?;
    info!(
        "Trendcast {} starting: Mode={:?}, ModelDir={:?}",
        env!("CARGO_PKG_VERSION"),
        config.mode,
        config.model_dir
    );

    let service = build_service(&config)?;

    match args.command {
        Command::Predict { ticker, closes } => {
            let forecast = service.forecast(&ticker, closes).await?;
            print_json(&forecast)
        }
        Command::Train {
            ticker: tickers,
            force,
        } => {
            let results = service.warm_up(&tickers, force).await;

            let mut trained = Vec::new();
            let mut failures = 0;
            for (ticker, result) in results {
                match result {
                    Ok(model) => trained.push(model.metadata().clone()),
                    Err(e) => {
                        error!("Training {} failed: {}", ticker, e);
                        failures += 1;
                    }
                }
            }

            print_json(&trained)?;
            if failures > 0 {
                anyhow::bail!("{} of {} tickers failed to train", failures, tickers.len());
            }
            Ok(())
        }
        Command::Info { ticker } => {
            let info = service.model_info(&ticker).await?;
            print_json(&info)
        }
        Command::Features => Ok(()),
    }
}
