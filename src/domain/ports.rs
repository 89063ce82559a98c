use crate::domain::errors::ForecastError;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ml::model::TrainedModel;
use anyhow::Result;
use async_trait::async_trait;

/// Source of daily closing prices.
#[async_trait]
pub trait ClosesProvider: Send + Sync {
    /// Returns up to `window` most recent daily closes for `ticker`, oldest first.
    ///
    /// Unknown tickers and unreachable backends are reported as
    /// `ForecastError::DataUnavailable`.
    async fn fetch_recent_closes(
        &self,
        ticker: &str,
        window: usize,
    ) -> Result<PriceSeries, ForecastError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Durable per-ticker model storage. One artifact per ticker, latest write wins.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Persist the model under its ticker, replacing any previous artifact.
    async fn save(&self, model: &TrainedModel) -> Result<()>;

    /// Load the model for `ticker`, or `None` if nothing was stored.
    async fn load(&self, ticker: &str) -> Result<Option<TrainedModel>>;

    /// Tickers that currently have a stored artifact.
    async fn list(&self) -> Result<Vec<String>>;
}
