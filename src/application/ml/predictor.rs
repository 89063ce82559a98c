use crate::application::ml::feature_extractor::extract;
use crate::domain::errors::ForecastError;
use crate::domain::ml::feature_registry::{FeatureSchema, FeatureVector};
use crate::domain::ml::forecast::DirectionForecast;
use crate::domain::ml::model::TrainedModel;

/// Interface for models that score a feature vector
pub trait ScoringModel: Send + Sync {
    /// Feature layout the model was trained on
    fn feature_schema(&self) -> &FeatureSchema;

    /// Probability (0.0 to 1.0) that the next close is higher
    fn prob_up(&self, features: &FeatureVector) -> Result<f64, ForecastError>;

    /// Get model name/type
    fn name(&self) -> &str;
}

impl ScoringModel for TrainedModel {
    fn feature_schema(&self) -> &FeatureSchema {
        TrainedModel::feature_schema(self)
    }

    fn prob_up(&self, features: &FeatureVector) -> Result<f64, ForecastError> {
        TrainedModel::prob_up(self, features)
    }

    fn name(&self) -> &str {
        "Gradient Boosted Trees"
    }
}

/// Scores the trailing window of `closes` against `model`.
pub fn predict<M>(model: &M, closes: &[f64]) -> Result<DirectionForecast, ForecastError>
where
    M: ScoringModel + ?Sized,
{
    let features = extract(closes)?;

    let produced = features.schema();
    if model.feature_schema() != &produced {
        return Err(ForecastError::SchemaMismatch {
            expected: model.feature_schema().to_string(),
            actual: produced.to_string(),
        });
    }

    let prob_up = model.prob_up(&features)?;
    if !prob_up.is_finite() {
        return Err(ForecastError::Training {
            reason: format!("{} returned non-finite probability", model.name()),
        });
    }

    Ok(DirectionForecast::from_prob_up(prob_up))
}
