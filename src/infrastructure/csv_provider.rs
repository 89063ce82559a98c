use crate::domain::errors::ForecastError;
use crate::domain::market::price_series::{PricePoint, PriceSeries};
use crate::domain::ports::ClosesProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Daily closes from `<dir>/<TICKER>.csv` files with a `date,close` header.
///
/// Rows may be in any order; duplicate dates keep the last row.
pub struct CsvClosesProvider {
    dir: PathBuf,
}

impl CsvClosesProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker))
    }

    fn parse(ticker: &str, content: &[u8]) -> Result<PriceSeries> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content);

        let mut points = Vec::new();
        for (i, result) in rdr.deserialize::<PricePoint>().enumerate() {
            let point: PricePoint = result.with_context(|| format!("Bad row {}", i + 1))?;
            if !(point.close.is_finite() && point.close > 0.0) {
                anyhow::bail!("Row {} has non-positive close {}", i + 1, point.close);
            }
            points.push(point);
        }

        Ok(PriceSeries::from_unordered(ticker, points))
    }
}

#[async_trait]
impl ClosesProvider for CsvClosesProvider {
    async fn fetch_recent_closes(
        &self,
        ticker: &str,
        window: usize,
    ) -> Result<PriceSeries, ForecastError> {
        let path = self.file_path(ticker);

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ForecastError::unavailable(
                    ticker,
                    format!("no price file at {}", path.display()),
                ));
            }
            Err(e) => {
                return Err(ForecastError::unavailable(
                    ticker,
                    format!("failed to read {}: {}", path.display(), e),
                ));
            }
        };

        let series = Self::parse(ticker, &content)
            .map_err(|e| {
                ForecastError::unavailable(ticker, format!("{}: {:#}", path.display(), e))
            })?
            .tail(window);

        if series.is_empty() {
            return Err(ForecastError::unavailable(
                ticker,
                format!("{} has no rows", path.display()),
            ));
        }

        info!(
            "CsvClosesProvider: Loaded {} closes for {} from {:?}",
            series.len(),
            ticker,
            path
        );
        Ok(series)
    }

    fn name(&self) -> &str {
        "csv"
    }
}
