use crate::domain::errors::ForecastError;
use crate::domain::ml::booster::GradientBoostedClassifier;
use crate::domain::ml::feature_registry::{FeatureSchema, FeatureVector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: Uuid,
    pub ticker: String,
    pub trained_at: DateTime<Utc>,
    pub feature_schema: FeatureSchema,
    pub n_examples: usize,
    pub n_trees: usize,
    /// Accuracy on the chronological hold-out, when one was used.
    pub validation_accuracy: Option<f64>,
}

/// A trained per-ticker classifier. Immutable once built.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    metadata: ModelMetadata,
    classifier: GradientBoostedClassifier,
}

impl TrainedModel {
    pub fn new(metadata: ModelMetadata, classifier: GradientBoostedClassifier) -> Self {
        Self {
            metadata,
            classifier,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn ticker(&self) -> &str {
        &self.metadata.ticker
    }

    pub fn model_id(&self) -> Uuid {
        self.metadata.model_id
    }

    pub fn feature_schema(&self) -> &FeatureSchema {
        &self.metadata.feature_schema
    }

    /// Probability that the next close is higher.
    pub fn prob_up(&self, features: &FeatureVector) -> Result<f64, ForecastError> {
        self.classifier
            .predict_proba(&[features.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| ForecastError::Training {
                reason: "No prediction returned".to_string(),
            })
    }
}
