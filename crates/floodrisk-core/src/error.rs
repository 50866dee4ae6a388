//! Error types for floodrisk-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for floodrisk operations
pub type Result<T> = std::result::Result<T, FloodRiskError>;

/// Main error type for floodrisk operations
#[derive(Error, Debug)]
pub enum FloodRiskError {
    /// Artifact loading errors
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Prediction errors
    #[error("Prediction error: {0}")]
    Predict(#[from] PredictError),
}

/// Errors raised while turning a raw payload into an aligned record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    /// A value could not be coerced to a number
    #[error("Unable to parse value {value} for feature '{feature}' as a number")]
    NonNumericValue { feature: String, value: String },

    /// One or more catalog features are absent from the payload
    #[error("Missing features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// The payload carries keys that are not in the catalog
    #[error("Unknown features: {}", .0.join(", "))]
    UnknownFeatures(Vec<String>),

    /// The scaling transform failed
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),
}

/// Errors raised by a fitted preprocessing transform
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// No sub-transformer registered under the requested key
    #[error("Unknown transformer '{0}'")]
    UnknownTransformer(String),

    /// Input or output column count does not match the fitted width
    #[error("Transformer '{key}' expects {expected} columns, got {actual}")]
    WidthMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },

    /// Scaled output contains NaN or an infinity
    #[error("Transformer '{key}' produced a non-finite value")]
    NonFinite { key: String },
}

/// Errors raised by a fitted classifier
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Row width does not match the model's input width
    #[error("Model expects {expected} features, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    /// The artifact is internally inconsistent
    #[error("Malformed model: {0}")]
    Malformed(String),
}

/// Errors raised while loading artifacts from disk
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON for the expected artifact
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Feature catalog has no entries
    #[error("Feature catalog is empty")]
    EmptyCatalog,

    /// Feature catalog names a column twice
    #[error("Duplicate feature in catalog: {0}")]
    DuplicateFeature(String),

    /// Artifact content failed a consistency check
    #[error("Invalid artifact: {0}")]
    Invalid(String),
}

/// Configuration validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Inline config text is not valid TOML
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A scaling feature is not part of the catalog
    #[error("Scaling feature '{0}' is not in the feature catalog")]
    UnknownScalingFeature(String),

    /// A scaling feature is listed twice
    #[error("Scaling feature '{0}' is listed more than once")]
    DuplicateScalingFeature(String),

    /// The preprocessor has no transformer under the configured key
    #[error("Preprocessor has no transformer named '{0}'")]
    MissingScaler(String),

    /// Artifact widths disagree with the configured catalog or subset
    #[error("Width mismatch for {what}: expected {expected}, got {actual}")]
    WidthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Value is out of valid range
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// Tagged failure of a single prediction request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    /// Payload failed validation or alignment
    #[error(transparent)]
    Align(#[from] AlignError),

    /// The classifier failed on an aligned row
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Stable machine-readable tag for a prediction failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NonNumericValue,
    MissingFeatures,
    UnknownFeatures,
    Transform,
    Model,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NonNumericValue => "non_numeric_value",
            ErrorKind::MissingFeatures => "missing_features",
            ErrorKind::UnknownFeatures => "unknown_features",
            ErrorKind::Transform => "transform",
            ErrorKind::Model => "model",
        }
    }

    /// Whether the failure is attributable to the request payload
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::NonNumericValue | ErrorKind::MissingFeatures | ErrorKind::UnknownFeatures
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PredictError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictError::Align(AlignError::NonNumericValue { .. }) => ErrorKind::NonNumericValue,
            PredictError::Align(AlignError::MissingFeatures(_)) => ErrorKind::MissingFeatures,
            PredictError::Align(AlignError::UnknownFeatures(_)) => ErrorKind::UnknownFeatures,
            PredictError::Align(AlignError::Transform(_)) => ErrorKind::Transform,
            PredictError::Model(_) => ErrorKind::Model,
        }
    }
}
