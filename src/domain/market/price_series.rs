use crate::domain::errors::ForecastError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closing prices for one ticker, strictly ascending by date.
///
/// Length requirements are enforced by the consumers (feature extraction needs
/// 11 closes, labeling needs 12), not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, rejecting out-of-order or duplicate dates.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, ForecastError> {
        let ticker = ticker.into();

        if let Some(pair) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(ForecastError::unavailable(
                ticker,
                format!(
                    "price series not strictly ascending ({} followed by {})",
                    pair[0].date, pair[1].date
                ),
            ));
        }

        Ok(Self { ticker, points })
    }

    /// Sorts and de-duplicates raw provider rows before building the series.
    /// A later row for the same date wins.
    pub fn from_unordered(ticker: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self {
            ticker: ticker.into(),
            points: deduped,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Keeps only the most recent `window` points.
    pub fn tail(mut self, window: usize) -> Self {
        if self.points.len() > window {
            self.points.drain(..self.points.len() - window);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
        }
    }

    #[test]
    fn test_rejects_unordered_dates() {
        let result = PriceSeries::new("AAPL", vec![point(2, 100.0), point(1, 101.0)]);
        assert!(matches!(result, Err(ForecastError::DataUnavailable { .. })));

        let dup = PriceSeries::new("AAPL", vec![point(2, 100.0), point(2, 101.0)]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_from_unordered_sorts_and_dedupes() {
        let series = PriceSeries::from_unordered(
            "AAPL",
            vec![point(3, 103.0), point(1, 101.0), point(3, 104.0), point(2, 102.0)],
        );

        assert_eq!(series.closes(), vec![101.0, 102.0, 104.0]);
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 3));
    }

    #[test]
    fn test_tail_keeps_most_recent() {
        let series = PriceSeries::new(
            "AAPL",
            (1..=5).map(|d| point(d, 100.0 + d as f64)).collect(),
        )
        .unwrap()
        .tail(2);

        assert_eq!(series.closes(), vec![104.0, 105.0]);
        assert_eq!(series.ticker(), "AAPL");
    }
}
