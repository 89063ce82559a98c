use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered list of feature names.
/// This order MUST match the column order of every trained model.
/// Any change here is a breaking change and requires bumping
/// `FEATURE_SCHEMA_VERSION`.
pub const FEATURE_NAMES: &[&str] = &[
    "mean_return_1d",
    "mean_return_3d",
    "mean_return_5d",
    "mean_return_10d",
    "volatility_10d",
];

pub const FEATURE_SCHEMA_VERSION: u32 = 1;

pub const FEATURE_COUNT: usize = 5;

/// Identity of the feature layout a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub names: Vec<String>,
}

impl FeatureSchema {
    /// The schema produced by this build's feature extractor.
    pub fn current() -> Self {
        Self {
            version: FEATURE_SCHEMA_VERSION,
            names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn is_current(&self) -> bool {
        *self == Self::current()
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}[{}]", self.version, self.names.join(","))
    }
}

/// Features extracted from a trailing window of closes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub mean_return_1d: f64,
    pub mean_return_3d: f64,
    pub mean_return_5d: f64,
    pub mean_return_10d: f64,
    pub volatility_10d: f64,
}

impl FeatureVector {
    /// Values in `FEATURE_NAMES` order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.mean_return_1d,
            self.mean_return_3d,
            self.mean_return_5d,
            self.mean_return_10d,
            self.volatility_10d,
        ]
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    /// Schema of every vector built by this type.
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::current()
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}
