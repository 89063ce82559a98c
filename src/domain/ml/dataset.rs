use crate::domain::ml::feature_registry::FeatureVector;
use serde::{Deserialize, Serialize};

/// A feature vector with its next-day outcome (1 = up, 0 = down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub features: FeatureVector,
    pub label: u8,
}

impl LabeledExample {
    pub fn target(&self) -> f64 {
        f64::from(self.label)
    }
}

/// Count of (down, up) labels.
pub fn class_counts(examples: &[LabeledExample]) -> (usize, usize) {
    let up = examples.iter().filter(|e| e.label == 1).count();
    (examples.len() - up, up)
}
