use crate::domain::errors::ForecastError;
use crate::domain::market::price_series::{PricePoint, PriceSeries};
use crate::domain::ports::ClosesProvider;
use crate::infrastructure::http_client_factory::{HttpClientFactory, build_url_with_query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One row of `/tiingo/daily/{ticker}/prices`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TiingoBar {
    /// ISO timestamp, e.g. `2024-01-02T00:00:00.000Z`
    date: String,
    close: f64,
    /// Split and dividend adjusted close
    adj_close: Option<f64>,
}

/// Daily closes from the Tiingo end-of-day API, adjusted for splits and dividends.
pub struct TiingoClosesProvider {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl TiingoClosesProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Calendar lookback that covers `window` trading days, with slack for holidays.
    fn start_date(window: usize) -> NaiveDate {
        let calendar_days = (window as u64 * 7).div_ceil(5) + 10;
        let today = Utc::now().date_naive();
        today
            .checked_sub_days(Days::new(calendar_days))
            .unwrap_or(NaiveDate::MIN)
    }

    /// `Ok(None)` when Tiingo does not know the ticker.
    async fn fetch_bars(&self, ticker: &str, start: NaiveDate) -> Result<Option<Vec<TiingoBar>>> {
        let url = format!("{}/tiingo/daily/{}/prices", self.base_url, ticker);
        let start = start.format("%Y-%m-%d").to_string();
        let url_with_query = build_url_with_query(&url, &[("startDate", start.as_str())]);

        debug!("TiingoClosesProvider: GET {}", url_with_query);

        let response = self
            .client
            .get(&url_with_query)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/json")
            .send()
            .await
            .context("Failed to fetch daily prices from Tiingo")?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Tiingo prices fetch failed ({}): {}", status, error_text);
        }

        let bars: Vec<TiingoBar> = response
            .json()
            .await
            .context("Failed to parse Tiingo prices response")?;

        Ok(Some(bars))
    }
}

/// Keeps bars with a parseable date and a positive adjusted close.
fn bars_to_series(ticker: &str, bars: Vec<TiingoBar>) -> PriceSeries {
    let total = bars.len();
    let points: Vec<PricePoint> = bars
        .into_iter()
        .filter_map(|bar| {
            let date = NaiveDate::parse_from_str(bar.date.get(..10)?, "%Y-%m-%d").ok()?;
            let close = bar.adj_close.unwrap_or(bar.close);
            (close.is_finite() && close > 0.0).then_some(PricePoint { date, close })
        })
        .collect();

    if points.len() < total {
        warn!(
            "TiingoClosesProvider: dropped {} malformed bars for {}",
            total - points.len(),
            ticker
        );
    }

    PriceSeries::from_unordered(ticker, points)
}

#[async_trait]
impl ClosesProvider for TiingoClosesProvider {
    async fn fetch_recent_closes(
        &self,
        ticker: &str,
        window: usize,
    ) -> Result<PriceSeries, ForecastError> {
        let bars = match self.fetch_bars(ticker, Self::start_date(window)).await {
            Ok(Some(bars)) => bars,
            Ok(None) => {
                return Err(ForecastError::unavailable(ticker, "unknown ticker"));
            }
            Err(e) => {
                return Err(ForecastError::unavailable(ticker, format!("{:#}", e)));
            }
        };

        let series = bars_to_series(ticker, bars).tail(window);
        if series.is_empty() {
            return Err(ForecastError::unavailable(ticker, "no prices returned"));
        }

        info!(
            "TiingoClosesProvider: {} closes for {} (last {:?})",
            series.len(),
            ticker,
            series.last_date()
        );
        Ok(series)
    }

    fn name(&self) -> &str {
        "tiingo"
    }
}
