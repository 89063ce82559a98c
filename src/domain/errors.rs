use thiserror::Error;

/// Errors raised by the forecasting core.
///
/// The enum is `Clone` so a single failed training run can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("Degenerate dataset: all {count} examples are labeled {label}")]
    DegenerateDataset { label: u8, count: usize },

    #[error("Price data unavailable for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("Feature schema mismatch: model expects {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Invalid ticker symbol: {ticker:?}")]
    InvalidTicker { ticker: String },

    #[error("Training failed: {reason}")]
    Training { reason: String },

    #[error("Model storage failed for {ticker}: {reason}")]
    Storage { ticker: String, reason: String },

    #[error("Training for {ticker} was aborted before completion")]
    TrainingAborted { ticker: String },
}

impl ForecastError {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        ForecastError::InsufficientData {
            reason: reason.into(),
        }
    }

    pub fn unavailable(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        ForecastError::DataUnavailable {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }

    /// Whether the same request may succeed if simply retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ForecastError::DataUnavailable { .. }
                | ForecastError::Storage { .. }
                | ForecastError::TrainingAborted { .. }
        )
    }

    /// Internal invariant violations. These indicate a bug, not bad input.
    pub fn is_bug(&self) -> bool {
        matches!(self, ForecastError::SchemaMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_formatting() {
        let err = ForecastError::DegenerateDataset {
            label: 1,
            count: 42,
        };

        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("labeled 1"));
    }

    #[test]
    fn test_unavailable_formatting() {
        let err = ForecastError::unavailable("AAPL", "HTTP 404");

        let msg = err.to_string();
        assert!(msg.contains("AAPL"));
        assert!(msg.contains("HTTP 404"));
    }

    #[test]
    fn test_error_classification() {
        assert!(ForecastError::unavailable("MSFT", "timeout").is_transient());
        assert!(!ForecastError::insufficient("3 closes").is_transient());
        assert!(
            !ForecastError::DegenerateDataset { label: 0, count: 5 }.is_transient()
        );

        let mismatch = ForecastError::SchemaMismatch {
            expected: "v1[a,b]".to_string(),
            actual: "v2[a]".to_string(),
        };
        assert!(mismatch.is_bug());
        assert!(!mismatch.is_transient());
    }
}
