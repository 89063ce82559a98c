use crate::application::ml::model_store::{ModelState, ModelStore};
use crate::application::ml::predictor::predict;
use crate::domain::errors::ForecastError;
use crate::domain::market::ticker::normalize_ticker;
use crate::domain::ml::feature_registry::FEATURE_NAMES;
use crate::domain::ml::forecast::DirectionForecast;
use crate::domain::ml::model::{ModelMetadata, TrainedModel};
use crate::domain::ports::ClosesProvider;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// What a presentation layer needs to describe a ticker's model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub state: String,
    pub metadata: ModelMetadata,
    pub feature_names: Vec<String>,
}

/// Serving entry point: get-or-train, then predict.
pub struct ForecastService {
    store: Arc<ModelStore>,
    provider: Arc<dyn ClosesProvider>,
    prediction_window: usize,
}

impl ForecastService {
    pub fn new(
        store: Arc<ModelStore>,
        provider: Arc<dyn ClosesProvider>,
        prediction_window: usize,
    ) -> Self {
        Self {
            store,
            provider,
            prediction_window,
        }
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    /// Ordered feature names every model consumes.
    pub fn feature_names() -> &'static [&'static str] {
        FEATURE_NAMES
    }

    /// Next-day direction for `ticker`.
    ///
    /// Uses `closes` when given, otherwise the provider's most recent
    /// `prediction_window` closes.
    pub async fn forecast(
        &self,
        ticker: &str,
        closes: Option<Vec<f64>>,
    ) -> Result<DirectionForecast, ForecastError> {
        let ticker = normalize_ticker(ticker)?;
        let model = self
            .store
            .get_or_train(&ticker, self.provider.as_ref())
            .await?;

        let closes = match closes {
            Some(closes) => closes,
            None => self.recent_closes(&ticker).await?,
        };

        let forecast = predict(model.as_ref(), &closes)?
            .with_ticker(ticker.as_str())
            .with_closes_used(closes.len());

        info!(
            "ForecastService: {} -> {} (prob_up {:.4}, model {})",
            ticker,
            forecast.direction,
            forecast.prob_up,
            model.model_id()
        );
        Ok(forecast)
    }

    /// Ensures a model exists for `ticker`; `force` retrains even if one does.
    pub async fn train(
        &self,
        ticker: &str,
        force: bool,
    ) -> Result<Arc<TrainedModel>, ForecastError> {
        if force {
            self.store.retrain(ticker, self.provider.as_ref()).await
        } else {
            self.store.get_or_train(ticker, self.provider.as_ref()).await
        }
    }

    /// Gets or trains models for several tickers concurrently.
    pub async fn warm_up(
        &self,
        tickers: &[String],
        force: bool,
    ) -> Vec<(String, Result<Arc<TrainedModel>, ForecastError>)> {
        let runs = tickers.iter().map(|ticker| async move {
            let result = self.train(ticker, force).await;
            if let Err(e) = &result {
                warn!("ForecastService: warm-up of {} failed: {}", ticker, e);
            }
            (ticker.clone(), result)
        });
        join_all(runs).await
    }

    /// Metadata and expected features of the model serving `ticker`.
    pub async fn model_info(&self, ticker: &str) -> Result<ModelInfo, ForecastError> {
        let model = self
            .store
            .get_or_train(ticker, self.provider.as_ref())
            .await?;

        let state: ModelState = self.store.state(model.ticker());
        Ok(ModelInfo {
            state: state.to_string(),
            metadata: model.metadata().clone(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        })
    }

    async fn recent_closes(&self, ticker: &str) -> Result<Vec<f64>, ForecastError> {
        let timeout = self.store.config().provider_timeout;
        let fetch = self
            .provider
            .fetch_recent_closes(ticker, self.prediction_window);

        match tokio::time::timeout(timeout, fetch).await {
            Ok(series) => Ok(series?.closes()),
            Err(_) => Err(ForecastError::unavailable(
                ticker,
                format!(
                    "{} did not respond within {:?}",
                    self.provider.name(),
                    timeout
                ),
            )),
        }
    }
}
