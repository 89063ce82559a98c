use crate::application::ml::feature_extractor::{MIN_CLOSES, extract, validate_closes};
use crate::domain::errors::ForecastError;
use crate::domain::ml::dataset::LabeledExample;
use crate::domain::ml::forecast::Direction;

/// Closes needed for at least one labeled example.
pub const MIN_TRAINING_CLOSES: usize = MIN_CLOSES + 1;

/// Builds chronologically ordered training examples from a close series.
///
/// Example `i` uses the 11-close window ending at `closes[i]` and is labeled by
/// `closes[i + 1] > closes[i]`. A series of length N yields N - 11 examples.
pub fn build_examples(closes: &[f64]) -> Result<Vec<LabeledExample>, ForecastError> {
    if closes.len() < MIN_TRAINING_CLOSES {
        return Err(ForecastError::insufficient(format!(
            "need at least {} closes to build a labeled example, got {}",
            MIN_TRAINING_CLOSES,
            closes.len()
        )));
    }
    validate_closes(closes)?;

    (MIN_CLOSES - 1..closes.len() - 1)
        .map(|i| {
            let features = extract(&closes[i + 1 - MIN_CLOSES..=i])?;
            let label = Direction::from_closes(closes[i], closes[i + 1]).label();
            Ok(LabeledExample { features, label })
        })
        .collect()
}
