//! Configuration for the flood-risk service
//!
//! Every field has a default, so an empty TOML file (or none at all) is a
//! valid configuration:
//!
//! ```toml
//! addr = "0.0.0.0:8000"
//! allowed_origin = "https://meteo.example.org"
//! error_status = "client_error"
//!
//! [artifacts]
//! dir = "/srv/floodrisk"
//!
//! [scaling]
//! scaler_key = "num"
//! subset = ["pluie_24h", "humidite"]
//!
//! [validation]
//! unknown_keys = "reject"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aligner::UnknownKeyPolicy;
use crate::artifacts::ArtifactPaths;
use crate::catalog::ScalingPlan;
use crate::error::ConfigError;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "FLOODRISK_CONFIG";
/// Environment override for the listen address
pub const ADDR_ENV: &str = "FLOODRISK_ADDR";
/// Environment override for the artifact directory
pub const ARTIFACTS_DIR_ENV: &str = "FLOODRISK_ARTIFACTS_DIR";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
    /// The single origin allowed to call the API from a browser
    pub allowed_origin: String,
    /// Body of `GET /`
    pub message: String,
    /// HTTP status used for prediction errors
    pub error_status: ErrorStatusPolicy,
    pub artifacts: ArtifactConfig,
    pub scaling: ScalingPlan,
    pub validation: ValidationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            allowed_origin: "http://localhost:8000".to_string(),
            message: "API de prédiction d'inondation sur votre département".to_string(),
            error_status: ErrorStatusPolicy::default(),
            artifacts: ArtifactConfig::default(),
            scaling: ScalingPlan::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// How prediction failures map to HTTP status codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatusPolicy {
    /// 200 with an `{"error": ...}` body
    #[default]
    Ok,
    /// 422 for payload errors, 500 for transform and model faults
    ClientError,
}

/// Artifact file locations
///
/// Individual paths are optional; relative ones resolve against `dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            features: None,
            preprocessor: None,
            model: None,
        }
    }
}

impl ArtifactConfig {
    pub fn paths(&self) -> ArtifactPaths {
        let mut paths = ArtifactPaths::in_dir(&self.dir);
        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.dir.join(p)
            }
        };
        if let Some(p) = &self.features {
            paths.features = resolve(p);
        }
        if let Some(p) = &self.preprocessor {
            paths.preprocessor = resolve(p);
        }
        if let Some(p) = &self.model {
            paths.model = resolve(p);
        }
        paths
    }
}

/// Request validation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub unknown_keys: UnknownKeyPolicy,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve configuration from the process environment
    ///
    /// Reads the file named by `FLOODRISK_CONFIG` if set, then applies
    /// `FLOODRISK_ADDR` and `FLOODRISK_ARTIFACTS_DIR` on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                tracing::info!("Loading configuration from {}", path);
                Self::load(path)?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from a lookup function
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(ADDR_ENV) {
            self.addr = addr;
        }
        if let Some(dir) = lookup(ARTIFACTS_DIR_ENV) {
            self.artifacts.dir = PathBuf::from(dir);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.trim().is_empty() {
            return Err(ConfigError::Invalid("addr must not be empty".to_string()));
        }

        if !(self.allowed_origin.starts_with("http://")
            || self.allowed_origin.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "allowed_origin must be an http(s) origin, got '{}'",
                self.allowed_origin
            )));
        }

        if self.allowed_origin.ends_with('/') {
            return Err(ConfigError::Invalid(
                "allowed_origin must not have a trailing slash".to_string(),
            ));
        }

        if !self.scaling.subset.is_empty() && self.scaling.scaler_key.is_empty() {
            return Err(ConfigError::Invalid(
                "scaling.scaler_key is required when scaling.subset is set".to_string(),
            ));
        }

        Ok(())
    }
}
