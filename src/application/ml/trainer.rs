//! Gradient-boosted decision tree training.
//!
//! Each boosting round fits a `smartcore` regression tree to the log-loss
//! residuals `y - sigmoid(F)` and adds it to the ensemble with shrinkage.
//! When enough examples exist, the most recent `validation_fraction` of them
//! is held out (chronologically, never shuffled) for early stopping.

use crate::domain::errors::ForecastError;
use crate::domain::ml::booster::{GradientBoostedClassifier, RegressionTree, logit, sigmoid};
use crate::domain::ml::dataset::{LabeledExample, class_counts};
use crate::domain::ml::feature_registry::FeatureSchema;
use crate::domain::ml::model::{ModelMetadata, TrainedModel};
use anyhow::{Result, bail};
use chrono::Utc;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::DecisionTreeRegressorParameters;
use tracing::{debug, info};
use uuid::Uuid;

/// Fits a classifier for one ticker. Implementations must not keep a
/// reference to the model they return.
pub trait Trainer: Send + Sync {
    fn train(
        &self,
        ticker: &str,
        examples: &[LabeledExample],
    ) -> Result<TrainedModel, ForecastError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
    /// Share of the most recent examples held out for early stopping.
    pub validation_fraction: f64,
    /// Below this many examples everything is used for training.
    pub min_validation_examples: usize,
    pub early_stopping_rounds: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.05,
            max_depth: 3,
            min_samples_leaf: 5,
            min_samples_split: 10,
            validation_fraction: 0.2,
            min_validation_examples: 40,
            early_stopping_rounds: 20,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            bail!("n_estimators must be at least 1");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            bail!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            );
        }
        if self.max_depth == 0 {
            bail!("max_depth must be at least 1");
        }
        if self.min_samples_leaf == 0 {
            bail!("min_samples_leaf must be at least 1");
        }
        if !(0.0..0.5).contains(&self.validation_fraction) {
            bail!(
                "validation_fraction must be in [0, 0.5), got {}",
                self.validation_fraction
            );
        }
        if self.early_stopping_rounds == 0 {
            bail!("early_stopping_rounds must be at least 1");
        }
        Ok(())
    }

    fn tree_parameters(&self) -> DecisionTreeRegressorParameters {
        DecisionTreeRegressorParameters::default()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_min_samples_split(self.min_samples_split)
    }
}

/// Outcome of one fit, before it is wrapped into a `TrainedModel`.
#[derive(Debug)]
pub struct FitOutcome {
    pub classifier: GradientBoostedClassifier,
    pub train_examples: usize,
    pub validation_examples: usize,
    pub validation_accuracy: Option<f64>,
}

pub struct GradientBoostingTrainer {
    config: TrainerConfig,
}

impl GradientBoostingTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Chronological train/validation split.
    fn split<'a>(
        &self,
        examples: &'a [LabeledExample],
    ) -> (&'a [LabeledExample], &'a [LabeledExample]) {
        if examples.len() < self.config.min_validation_examples {
            return (examples, &[]);
        }
        let n_valid = (examples.len() as f64 * self.config.validation_fraction).floor() as usize;
        examples.split_at(examples.len() - n_valid)
    }

    pub fn fit(&self, examples: &[LabeledExample]) -> Result<FitOutcome, ForecastError> {
        if examples.is_empty() {
            return Err(ForecastError::insufficient(
                "cannot train on an empty dataset",
            ));
        }

        let (train, valid) = self.split(examples);

        let (down, up) = class_counts(train);
        if up == 0 || down == 0 {
            return Err(ForecastError::DegenerateDataset {
                label: u8::from(up > 0),
                count: train.len(),
            });
        }

        let train_rows = rows(train);
        let x_train = matrix(&train_rows)?;
        let y_train: Vec<f64> = train.iter().map(LabeledExample::target).collect();

        let valid_rows = rows(valid);
        let x_valid = if valid.is_empty() {
            None
        } else {
            Some(matrix(&valid_rows)?)
        };
        let y_valid: Vec<f64> = valid.iter().map(LabeledExample::target).collect();

        let base_score = logit(up as f64 / train.len() as f64);
        let lr = self.config.learning_rate;
        let params = self.config.tree_parameters();

        let mut train_scores = vec![base_score; train.len()];
        let mut valid_scores = vec![base_score; valid.len()];
        let mut best_loss = log_loss(&y_valid, &valid_scores);
        let mut best_len = 0;
        let mut rounds_since_best = 0;
        let mut trees: Vec<RegressionTree> = Vec::with_capacity(self.config.n_estimators);

        for round in 0..self.config.n_estimators {
            let residuals: Vec<f64> = y_train
                .iter()
                .zip(&train_scores)
                .map(|(y, f)| y - sigmoid(*f))
                .collect();

            let tree = RegressionTree::fit(&x_train, &residuals, params.clone())
                .map_err(|e| training_failure("Tree fit failed", e))?;

            let step = tree
                .predict(&x_train)
                .map_err(|e| training_failure("Tree prediction failed", e))?;
            for (score, delta) in train_scores.iter_mut().zip(step) {
                *score += lr * delta;
            }

            if let Some(x_valid) = &x_valid {
                let step = tree
                    .predict(x_valid)
                    .map_err(|e| training_failure("Tree prediction failed", e))?;
                for (score, delta) in valid_scores.iter_mut().zip(step) {
                    *score += lr * delta;
                }
            }
            trees.push(tree);

            if x_valid.is_none() {
                continue;
            }

            let loss = log_loss(&y_valid, &valid_scores);
            if loss < best_loss - 1e-12 {
                best_loss = loss;
                best_len = trees.len();
                rounds_since_best = 0;
            } else {
                rounds_since_best += 1;
                if rounds_since_best >= self.config.early_stopping_rounds {
                    debug!(
                        "Early stopping at round {} (best round {}, validation log-loss {:.5})",
                        round + 1,
                        best_len,
                        best_loss
                    );
                    break;
                }
            }
        }

        if x_valid.is_some() {
            trees.truncate(best_len);
        }

        let classifier = GradientBoostedClassifier::new(base_score, lr, trees);

        let validation_accuracy = if valid.is_empty() {
            None
        } else {
            let probs = classifier.predict_proba(&valid_rows)?;
            let correct = probs
                .iter()
                .zip(valid)
                .filter(|(p, e)| u8::from(**p >= 0.5) == e.label)
                .count();
            Some(correct as f64 / valid.len() as f64)
        };

        Ok(FitOutcome {
            classifier,
            train_examples: train.len(),
            validation_examples: valid.len(),
            validation_accuracy,
        })
    }
}

impl Default for GradientBoostingTrainer {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}

impl Trainer for GradientBoostingTrainer {
    fn train(
        &self,
        ticker: &str,
        examples: &[LabeledExample],
    ) -> Result<TrainedModel, ForecastError> {
        let outcome = self.fit(examples)?;

        info!(
            "Trained {} on {} examples ({} held out): {} trees, validation accuracy {}",
            ticker,
            outcome.train_examples,
            outcome.validation_examples,
            outcome.classifier.n_trees(),
            outcome
                .validation_accuracy
                .map(|a| format!("{:.3}", a))
                .unwrap_or_else(|| "n/a".to_string())
        );

        let metadata = ModelMetadata {
            model_id: Uuid::new_v4(),
            ticker: ticker.to_string(),
            trained_at: Utc::now(),
            feature_schema: FeatureSchema::current(),
            n_examples: examples.len(),
            n_trees: outcome.classifier.n_trees(),
            validation_accuracy: outcome.validation_accuracy,
        };

        Ok(TrainedModel::new(metadata, outcome.classifier))
    }
}

fn rows(examples: &[LabeledExample]) -> Vec<Vec<f64>> {
    examples.iter().map(|e| e.features.to_vec()).collect()
}

fn matrix(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>, ForecastError> {
    DenseMatrix::from_2d_vec(&rows.to_vec())
        .map_err(|e| training_failure("Matrix creation failed", e))
}

fn training_failure(context: &str, e: impl std::fmt::Display) -> ForecastError {
    ForecastError::Training {
        reason: format!("{}: {}", context, e),
    }
}

/// Mean binary cross-entropy of raw scores. Zero for an empty set.
fn log_loss(labels: &[f64], scores: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(scores)
        .map(|(y, f)| {
            let p = sigmoid(*f).clamp(1e-15, 1.0 - 1e-15);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / labels.len() as f64
}
