//! Fitted preprocessing transforms
//!
//! A preprocessor is a set of named sub-transformers, each fitted on a
//! fixed list of columns. The JSON layout mirrors a scikit-learn
//! `ColumnTransformer` export:
//!
//! ```json
//! {
//!   "transformers": {
//!     "num": { "kind": "robust", "center": [12.0, 3.5], "scale": [4.0, 1.5] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, TransformError};

/// A pre-fitted numeric transformation addressed by sub-transformer key
pub trait Transform: Send + Sync {
    /// Number of input columns the named sub-transformer was fitted on
    fn width(&self, key: &str) -> Option<usize>;

    /// Apply the named sub-transformer to one row slice
    fn transform(&self, key: &str, columns: &[f64]) -> Result<Vec<f64>, TransformError>;
}

/// A single fitted scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedScaler {
    /// `(x - center) / scale`, center and scale from median and IQR
    Robust { center: Vec<f64>, scale: Vec<f64> },
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
    /// Identity over a fixed number of columns
    Passthrough { width: usize },
}

impl FittedScaler {
    pub fn width(&self) -> usize {
        match self {
            FittedScaler::Robust { scale, .. }
            | FittedScaler::Standard { scale, .. }
            | FittedScaler::MinMax { scale, .. } => scale.len(),
            FittedScaler::Passthrough { width } => *width,
        }
    }

    fn validate(&self, key: &str) -> Result<(), ArtifactError> {
        let (offset, scale) = match self {
            FittedScaler::Robust { center, scale } => (center, scale),
            FittedScaler::Standard { mean, scale } => (mean, scale),
            FittedScaler::MinMax { min, scale } => (min, scale),
            FittedScaler::Passthrough { .. } => return Ok(()),
        };

        if offset.len() != scale.len() {
            return Err(ArtifactError::Invalid(format!(
                "transformer '{}' has {} offsets but {} scales",
                key,
                offset.len(),
                scale.len()
            )));
        }
        if offset.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(ArtifactError::Invalid(format!(
                "transformer '{}' has non-finite parameters",
                key
            )));
        }
        Ok(())
    }

    fn apply(&self, columns: &[f64]) -> Vec<f64> {
        match self {
            FittedScaler::Robust { center, scale } => columns
                .iter()
                .zip(center.iter().zip(scale))
                .map(|(x, (c, s))| (x - c) / nonzero(*s))
                .collect(),
            FittedScaler::Standard { mean, scale } => columns
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / nonzero(*s))
                .collect(),
            FittedScaler::MinMax { min, scale } => columns
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
            FittedScaler::Passthrough { .. } => columns.to_vec(),
        }
    }
}

/// Constant columns are fitted with a zero scale; treat them as unit scale.
fn nonzero(scale: f64) -> f64 {
    if scale == 0.0 {
        1.0
    } else {
        scale
    }
}

/// Named collection of fitted scalers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub transformers: BTreeMap<String, FittedScaler>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration of a sub-transformer
    pub fn with_transformer(mut self, key: impl Into<String>, scaler: FittedScaler) -> Self {
        self.transformers.insert(key.into(), scaler);
        self
    }

    /// Check every sub-transformer for consistent parameter lengths
    pub fn validate(&self) -> Result<(), ArtifactError> {
        for (key, scaler) in &self.transformers {
            scaler.validate(key)?;
        }
        Ok(())
    }
}

impl Transform for Preprocessor {
    fn width(&self, key: &str) -> Option<usize> {
        self.transformers.get(key).map(FittedScaler::width)
    }

    fn transform(&self, key: &str, columns: &[f64]) -> Result<Vec<f64>, TransformError> {
        let scaler = self
            .transformers
            .get(key)
            .ok_or_else(|| TransformError::UnknownTransformer(key.to_string()))?;

        if columns.len() != scaler.width() {
            return Err(TransformError::WidthMismatch {
                key: key.to_string(),
                expected: scaler.width(),
                actual: columns.len(),
            });
        }

        Ok(scaler.apply(columns))
    }
}
