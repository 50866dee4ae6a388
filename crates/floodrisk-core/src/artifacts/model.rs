//! Fitted classifiers
//!
//! Two model families are supported, both exported from scikit-learn to
//! JSON:
//! - **linear**: logistic regression / linear SVM style decision functions
//! - **forest**: random forest or a single decision tree (forest of one)

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, ModelError};

/// A pre-fitted classifier producing one integer label per row
pub trait Classifier: Send + Sync {
    /// Number of input columns the model was fitted on
    fn n_features(&self) -> usize;

    fn predict(&self, row: &[f64]) -> Result<i64, ModelError>;
}

/// Serialized model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearClassifier),
    Forest(RandomForest),
}

impl ModelArtifact {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            ModelArtifact::Linear(m) => m.validate(),
            ModelArtifact::Forest(m) => m.validate(),
        }
    }
}

impl Classifier for ModelArtifact {
    fn n_features(&self) -> usize {
        match self {
            ModelArtifact::Linear(m) => m.n_features(),
            ModelArtifact::Forest(m) => m.n_features(),
        }
    }

    fn predict(&self, row: &[f64]) -> Result<i64, ModelError> {
        match self {
            ModelArtifact::Linear(m) => m.predict(row),
            ModelArtifact::Forest(m) => m.predict(row),
        }
    }
}

fn check_width(expected: usize, row: &[f64]) -> Result<(), ModelError> {
    if row.len() != expected {
        return Err(ModelError::WidthMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// Index of the largest score; ties resolve to the lowest index
fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

/// Linear decision function classifier
///
/// Binary models carry a single coefficient row; a positive decision
/// value selects `classes[1]`. Multiclass models carry one row per class
/// and pick the highest decision value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    pub classes: Vec<i64>,
}

impl LinearClassifier {
    fn validate(&self) -> Result<(), ArtifactError> {
        let rows = self.coefficients.len();
        if self.classes.len() < 2 {
            return Err(ArtifactError::Invalid(
                "linear model needs at least two classes".to_string(),
            ));
        }
        let expected_rows = if self.classes.len() == 2 {
            1
        } else {
            self.classes.len()
        };
        if rows != expected_rows || self.intercepts.len() != rows {
            return Err(ArtifactError::Invalid(format!(
                "linear model with {} classes needs {} coefficient rows and intercepts, got {} and {}",
                self.classes.len(),
                expected_rows,
                rows,
                self.intercepts.len()
            )));
        }
        let width = self.n_features();
        if width == 0 || self.coefficients.iter().any(|r| r.len() != width) {
            return Err(ArtifactError::Invalid(
                "linear model coefficient rows must share a non-zero width".to_string(),
            ));
        }
        Ok(())
    }

    fn decision(&self, row: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

impl Classifier for LinearClassifier {
    fn n_features(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    fn predict(&self, row: &[f64]) -> Result<i64, ModelError> {
        check_width(self.n_features(), row)?;
        let scores = self.decision(row);

        let idx = if self.classes.len() == 2 {
            match scores.first() {
                Some(&s) if s > 0.0 => 1,
                Some(_) => 0,
                None => return Err(ModelError::Malformed("no coefficient rows".to_string())),
            }
        } else {
            argmax(&scores).ok_or_else(|| ModelError::Malformed("no decision scores".to_string()))?
        };

        self.classes
            .get(idx)
            .copied()
            .ok_or_else(|| ModelError::Malformed(format!("class index {} out of range", idx)))
    }
}

/// A node of a fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// `row[feature] <= threshold` goes left, otherwise right
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class weights (sample counts or probabilities)
    Leaf { value: Vec<f64> },
}

/// Flat array of nodes, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::Invalid("decision tree has no nodes".to_string()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    // Children always come after their parent, which rules out cycles.
                    if *feature >= n_features
                        || *left <= i
                        || *right <= i
                        || *left >= self.nodes.len()
                        || *right >= self.nodes.len()
                    {
                        return Err(ArtifactError::Invalid(format!(
                            "decision tree node {} has invalid feature or child indices",
                            i
                        )));
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(ArtifactError::Invalid(format!(
                            "leaf {} has {} class weights, expected {}",
                            i,
                            value.len(),
                            n_classes
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk to a leaf and return its normalized class distribution
    fn leaf_distribution(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        let mut idx = 0;
        // Each step strictly increases idx, so the walk is bounded by the node count.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = row.get(*feature).ok_or_else(|| {
                        ModelError::Malformed(format!("split on missing feature {}", feature))
                    })?;
                    idx = if x <= threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => {
                    let total: f64 = value.iter().sum();
                    if total <= 0.0 {
                        return Ok(value.clone());
                    }
                    return Ok(value.iter().map(|v| v / total).collect());
                }
                None => {
                    return Err(ModelError::Malformed(format!("node {} out of range", idx)));
                }
            }
        }
        Err(ModelError::Malformed("tree walk did not reach a leaf".to_string()))
    }
}

/// Ensemble of decision trees with averaged class probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.n_features == 0 || self.classes.is_empty() || self.trees.is_empty() {
            return Err(ArtifactError::Invalid(
                "forest needs features, classes and at least one tree".to_string(),
            ));
        }
        for tree in &self.trees {
            tree.validate(self.n_features, self.classes.len())?;
        }
        Ok(())
    }

    /// Mean class probabilities across trees
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_width(self.n_features, row)?;

        let mut sum = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let dist = tree.leaf_distribution(row)?;
            for (acc, p) in sum.iter_mut().zip(dist) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, row: &[f64]) -> Result<i64, ModelError> {
        let proba = self.predict_proba(row)?;
        let idx = argmax(&proba).ok_or_else(|| ModelError::Malformed("no classes".to_string()))?;
        self.classes
            .get(idx)
            .copied()
            .ok_or_else(|| ModelError::Malformed(format!("class index {} out of range", idx)))
    }
}
