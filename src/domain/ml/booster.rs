//! Gradient-boosted tree classifier artifact.
//!
//! The ensemble is an additive log-odds model: `F(x) = base_score +
//! learning_rate * sum(tree_m(x))`, and `P(up | x) = sigmoid(F(x))`. Each tree
//! is a `smartcore` regression tree fitted to log-loss residuals by the trainer.

use crate::domain::errors::ForecastError;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::DecisionTreeRegressor;
use std::fmt;

pub type RegressionTree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Log-odds of `p`, clamped away from 0 and 1.
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}

#[derive(Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedClassifier {
    pub fn new(base_score: f64, learning_rate: f64, trees: Vec<RegressionTree>) -> Self {
        Self {
            base_score,
            learning_rate,
            trees,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Raw log-odds for each row.
    pub fn decision_function(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let x = DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(|e| ForecastError::Training {
            reason: format!("Matrix creation failed: {}", e),
        })?;

        let mut scores = vec![self.base_score; rows.len()];
        for tree in &self.trees {
            let step = tree.predict(&x).map_err(|e| ForecastError::Training {
                reason: format!("Tree prediction failed: {}", e),
            })?;
            for (score, delta) in scores.iter_mut().zip(step) {
                *score += self.learning_rate * delta;
            }
        }

        Ok(scores)
    }

    /// Probability of the positive class for each row.
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        Ok(self
            .decision_function(rows)?
            .into_iter()
            .map(sigmoid)
            .collect())
    }
}

impl fmt::Debug for GradientBoostedClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientBoostedClassifier")
            .field("base_score", &self.base_score)
            .field("learning_rate", &self.learning_rate)
            .field("n_trees", &self.trees.len())
            .finish()
    }
}
