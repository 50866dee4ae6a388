//! Feature catalog and scaling subset
//!
//! The catalog is the ordered list of columns the model was trained on.
//! It fixes both the required key set of a request and the column order
//! handed to the classifier.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, ConfigError};

/// Ordered, duplicate-free list of model input columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCatalog {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Serialize for FeatureCatalog {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.names.serialize(serializer)
    }
}

impl FeatureCatalog {
    pub fn new(names: Vec<String>) -> Result<Self, ArtifactError> {
        if names.is_empty() {
            return Err(ArtifactError::EmptyCatalog);
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(ArtifactError::DuplicateFeature(name.clone()));
            }
        }

        Ok(Self { names, index })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Column index of a feature
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// Which columns get rescaled, and by which named sub-transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingPlan {
    /// Key of the sub-transformer inside the preprocessor
    pub scaler_key: String,
    /// Columns fed to that sub-transformer, in its fitted order
    pub subset: Vec<String>,
}

impl Default for ScalingPlan {
    fn default() -> Self {
        Self {
            scaler_key: "num".to_string(),
            subset: [
                "resultat_obs_elab",
                "vent_moyen",
                "humidite",
                "pluie_24h",
                "vent_direction",
                "nb_rafales_10min",
                "nb_c_insee_meteo",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ScalingPlan {
    /// Bind the subset to catalog positions
    pub fn resolve(&self, catalog: &FeatureCatalog) -> Result<ResolvedScaling, ConfigError> {
        let mut seen = HashSet::new();
        let mut positions = Vec::with_capacity(self.subset.len());

        for name in &self.subset {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateScalingFeature(name.clone()));
            }
            let pos = catalog
                .position(name)
                .ok_or_else(|| ConfigError::UnknownScalingFeature(name.clone()))?;
            positions.push(pos);
        }

        Ok(ResolvedScaling {
            scaler_key: self.scaler_key.clone(),
            positions,
        })
    }
}

/// A scaling plan checked against a catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScaling {
    pub(crate) scaler_key: String,
    pub(crate) positions: Vec<usize>,
}

impl ResolvedScaling {
    pub fn scaler_key(&self) -> &str {
        &self.scaler_key
    }

    /// Catalog indices of the scaled columns
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn width(&self) -> usize {
        self.positions.len()
    }
}
