use crate::domain::errors::ForecastError;
use crate::domain::market::price_series::{PricePoint, PriceSeries};
use crate::domain::ports::ClosesProvider;
use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// Shape of the synthetic close series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSeries {
    /// Seeded random walk, reproducible per ticker.
    RandomWalk,
    /// Strictly increasing closes (single-class labels).
    Increasing,
    /// Alternating up/down days.
    Zigzag,
}

/// Offline closes provider producing deterministic synthetic daily history.
pub struct MockClosesProvider {
    series: MockSeries,
    delay: Option<Duration>,
    available: bool,
    fetches: AtomicUsize,
}

impl MockClosesProvider {
    pub fn new() -> Self {
        Self::with_series(MockSeries::RandomWalk)
    }

    pub fn with_series(series: MockSeries) -> Self {
        Self {
            series,
            delay: None,
            available: true,
            fetches: AtomicUsize::new(0),
        }
    }

    /// A provider that fails every request, as an unreachable backend would.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Simulated network latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `fetch_recent_closes` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// The closes this provider returns for `ticker`, oldest first.
    pub fn synthetic_closes(&self, ticker: &str, len: usize) -> Vec<f64> {
        let base_price = if ticker.contains("BTC") { 96000.0 } else { 150.0 };

        match self.series {
            MockSeries::Increasing => (0..len).map(|i| base_price + i as f64).collect(),
            MockSeries::Zigzag => (0..len)
                .map(|i| if i % 2 == 0 { base_price } else { base_price * 1.02 })
                .collect(),
            MockSeries::RandomWalk => {
                let seed = ticker
                    .bytes()
                    .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
                    });
                let mut rng = StdRng::seed_from_u64(seed);
                let mut price = base_price;
                (0..len)
                    .map(|_| {
                        // -2% to +2% daily, slight upward drift
                        price *= 1.0 + rng.random_range(-0.02..0.02) + 0.0003;
                        price
                    })
                    .collect()
            }
        }
    }
}

impl Default for MockClosesProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// The `len` weekdays ending on the anchor date, oldest first.
fn trading_days(len: usize) -> Vec<NaiveDate> {
    let mut day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default();
    let mut days = Vec::with_capacity(len);
    while days.len() < len {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day -= ChronoDuration::days(1);
    }
    days.reverse();
    days
}

#[async_trait]
impl ClosesProvider for MockClosesProvider {
    async fn fetch_recent_closes(
        &self,
        ticker: &str,
        window: usize,
    ) -> Result<PriceSeries, ForecastError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if !self.available {
            return Err(ForecastError::unavailable(ticker, "mock provider is offline"));
        }

        let points = trading_days(window)
            .into_iter()
            .zip(self.synthetic_closes(ticker, window))
            .map(|(date, close)| PricePoint { date, close })
            .collect();

        info!(
            "MockClosesProvider: Generated {} closes for {} ({:?})",
            window, ticker, self.series
        );

        PriceSeries::new(ticker, points)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
