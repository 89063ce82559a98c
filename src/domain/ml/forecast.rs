use serde::{Deserialize, Serialize};
use std::fmt;

/// Next-day price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Ties go to `Up`.
    pub fn from_prob_up(prob_up: f64) -> Self {
        if prob_up >= 0.5 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// Training label: 1 when the next close is strictly higher.
    pub fn from_closes(current: f64, next: f64) -> Self {
        if next > current {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn label(&self) -> u8 {
        match self {
            Direction::Up => 1,
            Direction::Down => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prediction result handed to the presentation boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionForecast {
    pub direction: Direction,
    pub prob_up: f64,
    pub prob_down: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closes_used: Option<usize>,
}

impl DirectionForecast {
    /// Builds a forecast from the up probability. Out-of-range inputs are clamped.
    pub fn from_prob_up(prob_up: f64) -> Self {
        let prob_up = prob_up.clamp(0.0, 1.0);
        Self {
            direction: Direction::from_prob_up(prob_up),
            prob_up,
            prob_down: 1.0 - prob_up,
            ticker: None,
            closes_used: None,
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_closes_used(mut self, closes_used: usize) -> Self {
        self.closes_used = Some(closes_used);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_breaks_up() {
        assert_eq!(Direction::from_prob_up(0.5), Direction::Up);
        assert_eq!(Direction::from_prob_up(0.4999), Direction::Down);
    }

    #[test]
    fn test_label_from_closes() {
        assert_eq!(Direction::from_closes(100.0, 100.5).label(), 1);
        assert_eq!(Direction::from_closes(100.0, 100.0).label(), 0);
        assert_eq!(Direction::from_closes(100.0, 99.0).label(), 0);
    }

    #[test]
    fn test_forecast_probabilities_sum_to_one() {
        for p in [0.0, 0.12, 0.5, 0.73, 1.0, 1.7, -0.2] {
            let forecast = DirectionForecast::from_prob_up(p);
            assert!((forecast.prob_up + forecast.prob_down - 1.0).abs() < 1e-12);
            assert_eq!(forecast.direction == Direction::Up, forecast.prob_up >= 0.5);
        }
    }

    #[test]
    fn test_forecast_json_shape() {
        let json = serde_json::to_value(
            DirectionForecast::from_prob_up(0.75)
                .with_ticker("AAPL")
                .with_closes_used(30),
        )
        .unwrap();

        assert_eq!(json["direction"], "up");
        assert_eq!(json["prob_up"], 0.75);
        assert_eq!(json["prob_down"], 0.25);
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["closes_used"], 30);

        let bare = serde_json::to_value(DirectionForecast::from_prob_up(0.1)).unwrap();
        assert!(bare.get("ticker").is_none());
        assert_eq!(bare["direction"], "down");
    }
}
