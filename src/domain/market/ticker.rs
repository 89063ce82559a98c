use crate::domain::errors::ForecastError;

const MAX_TICKER_LEN: usize = 16;

/// Normalizes a user-supplied ticker into its canonical cache key.
///
/// Symbols are upper-cased and may contain ASCII letters, digits, `.` and `-`
/// (e.g. `BRK.B`, `BRK-B`). The key is also used as a file name by the model
/// repository, so anything else is rejected.
pub fn normalize_ticker(raw: &str) -> Result<String, ForecastError> {
    let ticker = raw.trim().to_ascii_uppercase();

    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && !ticker.starts_with('.')
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if !valid {
        return Err(ForecastError::InvalidTicker {
            ticker: raw.to_string(),
        });
    }

    Ok(ticker)
}
