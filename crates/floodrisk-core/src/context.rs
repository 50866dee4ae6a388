//! Process-wide prediction context
//!
//! Built once at startup from the loaded artifacts and shared read-only
//! across requests. Nothing in here is mutated after construction, so
//! concurrent requests need no locking.

use crate::aligner::{AlignedRecord, FeatureAligner, RawInputRecord, UnknownKeyPolicy};
use crate::annotation::PredictionResult;
use crate::artifacts::{ArtifactSet, Classifier, Transform};
use crate::catalog::{FeatureCatalog, ScalingPlan};
use crate::error::{ConfigError, PredictError};

pub struct PredictionContext {
    aligner: FeatureAligner,
    transform: Box<dyn Transform>,
    model: Box<dyn Classifier>,
}

impl std::fmt::Debug for PredictionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionContext")
            .field("aligner", &self.aligner)
            .field("model_features", &self.model.n_features())
            .finish()
    }
}

impl PredictionContext {
    /// Assemble a context, checking that the pieces fit together
    pub fn new(
        catalog: FeatureCatalog,
        transform: Box<dyn Transform>,
        model: Box<dyn Classifier>,
        plan: &ScalingPlan,
        policy: UnknownKeyPolicy,
    ) -> Result<Self, ConfigError> {
        let scaling = plan.resolve(&catalog)?;

        if scaling.width() > 0 {
            let width = transform
                .width(scaling.scaler_key())
                .ok_or_else(|| ConfigError::MissingScaler(scaling.scaler_key().to_string()))?;
            if width != scaling.width() {
                return Err(ConfigError::WidthMismatch {
                    what: format!("transformer '{}'", scaling.scaler_key()),
                    expected: scaling.width(),
                    actual: width,
                });
            }
        }

        if model.n_features() != catalog.len() {
            return Err(ConfigError::WidthMismatch {
                what: "model input".to_string(),
                expected: catalog.len(),
                actual: model.n_features(),
            });
        }

        Ok(Self {
            aligner: FeatureAligner::new(catalog, scaling, policy),
            transform,
            model,
        })
    }

    pub fn from_artifacts(
        artifacts: ArtifactSet,
        plan: &ScalingPlan,
        policy: UnknownKeyPolicy,
    ) -> Result<Self, ConfigError> {
        Self::new(
            artifacts.catalog,
            Box::new(artifacts.preprocessor),
            Box::new(artifacts.model),
            plan,
            policy,
        )
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        self.aligner.catalog()
    }

    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }

    pub fn align(&self, raw: &RawInputRecord) -> Result<AlignedRecord, PredictError> {
        Ok(self.aligner.align(raw, self.transform.as_ref())?)
    }

    /// Validate, align, and classify one record
    pub fn predict(&self, raw: &RawInputRecord) -> Result<PredictionResult, PredictError> {
        let record = self.align(raw)?;
        let label = self.model.predict(record.values())?;
        Ok(PredictionResult::new(label))
    }
}
