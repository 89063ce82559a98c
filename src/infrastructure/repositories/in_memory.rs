//! In-Memory Model Repository
//!
//! Thread-safe, in-memory implementation of `ModelRepository`.
//!
//! Models are stored in their serialized JSON form, so every load goes through
//! the same encoding as the file-backed repository and hands out a fresh,
//! independent `TrainedModel`.
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - Not shared across processes

use crate::domain::ml::model::TrainedModel;
use crate::domain::ports::ModelRepository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct InMemoryModelRepository {
    models: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryModelRepository {
    pub fn new() -> Self {
        Self {
            models: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.models.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.models.read().await.is_empty()
    }
}

impl Default for InMemoryModelRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelRepository for InMemoryModelRepository {
    async fn save(&self, model: &TrainedModel) -> Result<()> {
        let json = serde_json::to_string(model).context("Failed to serialize model")?;
        self.models
            .write()
            .await
            .insert(model.ticker().to_string(), json);
        Ok(())
    }

    async fn load(&self, ticker: &str) -> Result<Option<TrainedModel>> {
        let models = self.models.read().await;
        match models.get(ticker) {
            Some(json) => {
                let model = serde_json::from_str(json)
                    .with_context(|| format!("Failed to parse stored model for {}", ticker))?;
                Ok(Some(model))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut tickers: Vec<String> = self.models.read().await.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::booster::{GradientBoostedClassifier, logit};
    use crate::domain::ml::feature_registry::{FeatureSchema, FeatureVector};
    use crate::domain::ml::model::ModelMetadata;
    use chrono::Utc;
    use uuid::Uuid;

    fn base_rate_model(ticker: &str, prob_up: f64) -> TrainedModel {
        TrainedModel::new(
            ModelMetadata {
                model_id: Uuid::new_v4(),
                ticker: ticker.to_string(),
                trained_at: Utc::now(),
                feature_schema: FeatureSchema::current(),
                n_examples: 10,
                n_trees: 0,
                validation_accuracy: None,
            },
            GradientBoostedClassifier::new(logit(prob_up), 0.1, Vec::new()),
        )
    }

    #[test]
    fn test_save_and_load() {
        let repo = InMemoryModelRepository::new();
        let model = base_rate_model("AAPL", 0.6);

        tokio_test::block_on(repo.save(&model)).unwrap();
        let loaded = tokio_test::block_on(repo.load("AAPL")).unwrap().unwrap();

        assert_eq!(loaded.metadata(), model.metadata());
        let p = loaded.prob_up(&FeatureVector::default()).unwrap();
        assert!((p - 0.6).abs() < 1e-9);
        assert!(tokio_test::block_on(repo.load("MSFT")).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_write_wins() {
        let repo = InMemoryModelRepository::new();
        let first = base_rate_model("AAPL", 0.6);
        let second = base_rate_model("AAPL", 0.3);

        repo.save(&first).await.unwrap();
        repo.save(&second).await.unwrap();
        repo.save(&base_rate_model("MSFT", 0.5)).await.unwrap();

        let loaded = repo.load("AAPL").await.unwrap().unwrap();
        assert_eq!(loaded.model_id(), second.model_id());
        assert_eq!(repo.len().await, 2);
        assert_eq!(repo.list().await.unwrap(), vec!["AAPL", "MSFT"]);
    }
}
