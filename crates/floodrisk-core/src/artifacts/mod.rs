//! Persisted model artifacts
//!
//! The service is backed by three files produced at training time:
//! the ordered feature names, the fitted preprocessor and the fitted
//! classifier. They are read once at startup and never reloaded.

pub mod model;
pub mod transform;

pub use model::*;
pub use transform::*;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::catalog::FeatureCatalog;
use crate::error::ArtifactError;

/// File locations of the three artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub features: PathBuf,
    pub preprocessor: PathBuf,
    pub model: PathBuf,
}

impl ArtifactPaths {
    /// Standard file names inside a directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            features: dir.join("feature_names.json"),
            preprocessor: dir.join("preprocessor.json"),
            model: dir.join("model.json"),
        }
    }
}

/// Everything needed to serve predictions, as loaded from disk
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub catalog: FeatureCatalog,
    pub preprocessor: Preprocessor,
    pub model: ModelArtifact,
}

impl ArtifactSet {
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let names: Vec<String> = read_json(&paths.features)?;
        let catalog = FeatureCatalog::new(names)?;

        let preprocessor: Preprocessor = read_json(&paths.preprocessor)?;
        preprocessor.validate()?;

        let model: ModelArtifact = read_json(&paths.model)?;
        model.validate()?;

        tracing::info!(
            features = catalog.len(),
            transformers = preprocessor.transformers.len(),
            "Loaded model artifacts from {:?}",
            paths.model.parent().unwrap_or_else(|| Path::new("."))
        );

        Ok(Self {
            catalog,
            preprocessor,
            model,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
