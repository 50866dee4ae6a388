//! floodrisk-core - Feature alignment and model evaluation
//!
//! Everything between a raw prediction payload and a risk label:
//!
//! - **catalog**: ordered feature list and the scaling subset
//! - **aligner**: numeric coercion, presence check, reordering, rescaling
//! - **artifacts**: fitted transforms and classifiers loaded from JSON
//! - **context**: immutable, load-once bundle shared by request handlers
//! - **annotation**: label to human-readable risk level

pub mod aligner;
pub mod annotation;
pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;

pub use aligner::{coerce_value, AlignedRecord, FeatureAligner, RawInputRecord, UnknownKeyPolicy};
pub use annotation::{PredictionResult, RiskLevel};
pub use artifacts::{ArtifactPaths, ArtifactSet, Classifier, ModelArtifact, Preprocessor, Transform};
pub use catalog::{FeatureCatalog, ResolvedScaling, ScalingPlan};
pub use config::{ErrorStatusPolicy, ServerConfig};
pub use context::PredictionContext;
pub use error::{
    AlignError, ArtifactError, ConfigError, ErrorKind, FloodRiskError, ModelError, PredictError,
    Result, TransformError,
};
