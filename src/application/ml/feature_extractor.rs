//! Feature extraction from a trailing window of daily closes.
//!
//! Every feature is derived from the last 10 simple daily returns, so exactly
//! the last 11 closes matter; earlier closes are only validated.

use crate::domain::errors::ForecastError;
use crate::domain::ml::feature_registry::FeatureVector;
use statrs::statistics::Statistics;

/// Closes needed for one feature vector (10 returns).
pub const MIN_CLOSES: usize = 11;

/// Returns used for `volatility_10d` and `mean_return_10d`.
pub const RETURN_WINDOW: usize = MIN_CLOSES - 1;

/// Simple returns `close[i] / close[i - 1] - 1`.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Rejects non-positive and non-finite closes.
pub fn validate_closes(closes: &[f64]) -> Result<(), ForecastError> {
    match closes
        .iter()
        .enumerate()
        .find(|(_, c)| !c.is_finite() || **c <= 0.0)
    {
        Some((index, close)) => Err(ForecastError::insufficient(format!(
            "close at index {} is {} (closes must be positive and finite)",
            index, close
        ))),
        None => Ok(()),
    }
}

/// Mean of the last `k` returns.
fn trailing_mean(returns: &[f64], k: usize) -> f64 {
    returns[returns.len() - k..].iter().mean()
}

/// Maps an ordered close sequence (oldest first) to its feature vector.
pub fn extract(closes: &[f64]) -> Result<FeatureVector, ForecastError> {
    if closes.len() < MIN_CLOSES {
        return Err(ForecastError::insufficient(format!(
            "need at least {} closes for feature extraction, got {}",
            MIN_CLOSES,
            closes.len()
        )));
    }
    validate_closes(closes)?;

    let returns = daily_returns(&closes[closes.len() - MIN_CLOSES..]);

    let features = FeatureVector {
        mean_return_1d: trailing_mean(&returns, 1),
        mean_return_3d: trailing_mean(&returns, 3),
        mean_return_5d: trailing_mean(&returns, 5),
        mean_return_10d: trailing_mean(&returns, RETURN_WINDOW),
        volatility_10d: returns.iter().std_dev(),
    };

    // Extreme price ratios can still overflow.
    if !features.is_finite() {
        return Err(ForecastError::insufficient(
            "closes produce non-finite features",
        ));
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [f64; 11] = [
        100.0, 101.0, 100.0, 102.0, 103.0, 104.0, 103.0, 105.0, 106.0, 107.0, 108.0,
    ];

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_sample_window_features() {
        let fv = extract(&SAMPLE).unwrap();

        let returns: Vec<f64> = (1..SAMPLE.len())
            .map(|i| SAMPLE[i] / SAMPLE[i - 1] - 1.0)
            .collect();
        let mean10 = returns.iter().sum::<f64>() / 10.0;
        let var10 = returns.iter().map(|r| (r - mean10).powi(2)).sum::<f64>() / 9.0;

        assert!(approx(fv.mean_return_10d, mean10));
        assert!(approx(fv.volatility_10d, var10.sqrt()));
        assert!(approx(fv.mean_return_1d, 108.0 / 107.0 - 1.0));
        assert!(approx(
            fv.mean_return_3d,
            returns[7..].iter().sum::<f64>() / 3.0
        ));
        assert!(approx(
            fv.mean_return_5d,
            returns[5..].iter().sum::<f64>() / 5.0
        ));
        assert!(fv.is_finite());
    }

    #[test]
    fn test_one_day_return() {
        let mut closes = vec![100.0; 10];
        closes.push(101.0);

        let fv = extract(&closes).unwrap();
        assert!((fv.mean_return_1d - 0.01).abs() < 1e-12);
        assert_eq!(daily_returns(&[100.0, 101.0]).len(), 1);
        assert!((daily_returns(&[100.0, 101.0])[0] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_short_input_is_insufficient() {
        for len in 0..MIN_CLOSES {
            let closes = vec![100.0; len];
            assert!(
                matches!(extract(&closes), Err(ForecastError::InsufficientData { .. })),
                "len {} should fail",
                len
            );
        }
    }

    #[test]
    fn test_invalid_closes_rejected() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let mut closes = SAMPLE.to_vec();
            closes[4] = bad;
            assert!(matches!(
                extract(&closes),
                Err(ForecastError::InsufficientData { .. })
            ));
        }

        // Validation covers the whole input, not just the trailing window.
        let mut closes = vec![-1.0];
        closes.extend_from_slice(&SAMPLE);
        assert!(extract(&closes).is_err());
    }

    #[test]
    fn test_only_trailing_window_matters() {
        let mut longer = vec![50.0, 75.0, 60.0];
        longer.extend_from_slice(&SAMPLE);

        assert_eq!(extract(&longer).unwrap(), extract(&SAMPLE).unwrap());
    }

    #[test]
    fn test_flat_series_has_zero_features() {
        let fv = extract(&[42.0; 20]).unwrap();
        assert_eq!(fv.to_array(), [0.0; 5]);
    }
}
