//! Request validation and feature alignment
//!
//! Turns one raw JSON payload into a numeric row in catalog order:
//!
//! 1. Coerce every value to a number
//! 2. Fail if any catalog feature is missing
//! 3. Project onto the catalog, in catalog order (extra keys dropped
//!    unless [`UnknownKeyPolicy::Reject`] is set)
//! 4. Rescale the configured subset through the named sub-transformer
//!
//! The aligner holds no mutable state; the same input always yields the
//! same record.

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::artifacts::Transform;
use crate::catalog::{FeatureCatalog, ResolvedScaling};
use crate::error::{AlignError, TransformError};

/// Raw request payload: feature name to untyped scalar
pub type RawInputRecord = serde_json::Map<String, Value>;

/// What to do with payload keys that are not in the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeyPolicy {
    /// Drop them silently
    #[default]
    Ignore,
    /// Fail with [`AlignError::UnknownFeatures`]
    Reject,
}

/// A numeric row whose columns are exactly the catalog, in catalog order
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRecord {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl AlignedRecord {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row values in catalog order, ready for the classifier
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for AlignedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Strict numeric coercion of a single JSON scalar
///
/// Numbers pass through, strings are trimmed and parsed, booleans map to
/// 1/0. Everything else, and any non-finite result, is rejected.
pub fn coerce_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Validates and reorders raw payloads against a fixed catalog
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    catalog: FeatureCatalog,
    scaling: ResolvedScaling,
    policy: UnknownKeyPolicy,
}

impl FeatureAligner {
    pub fn new(catalog: FeatureCatalog, scaling: ResolvedScaling, policy: UnknownKeyPolicy) -> Self {
        Self {
            catalog,
            scaling,
            policy,
        }
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn scaling(&self) -> &ResolvedScaling {
        &self.scaling
    }

    pub fn policy(&self) -> UnknownKeyPolicy {
        self.policy
    }

    pub fn align(
        &self,
        raw: &RawInputRecord,
        transform: &dyn Transform,
    ) -> Result<AlignedRecord, AlignError> {
        // 1. Numeric coercion over every supplied value, extras included
        let mut numeric: HashMap<&str, f64> = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            let n = coerce_value(value).ok_or_else(|| AlignError::NonNumericValue {
                feature: name.clone(),
                value: value.to_string(),
            })?;
            numeric.insert(name.as_str(), n);
        }

        // 2. Presence
        let missing: Vec<String> = self
            .catalog
            .names()
            .iter()
            .filter(|name| !numeric.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(AlignError::MissingFeatures(missing));
        }

        let unknown: Vec<String> = raw
            .keys()
            .filter(|k| !self.catalog.contains(k))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            match self.policy {
                UnknownKeyPolicy::Reject => return Err(AlignError::UnknownFeatures(unknown)),
                UnknownKeyPolicy::Ignore => {
                    tracing::debug!(dropped = ?unknown, "Ignoring features not in catalog");
                }
            }
        }

        // 3. Projection in catalog order
        let mut values: Vec<f64> = self
            .catalog
            .names()
            .iter()
            .map(|name| numeric[name.as_str()])
            .collect();

        // 4. Rescale the configured subset
        if self.scaling.width() > 0 {
            let slice: Vec<f64> = self.scaling.positions.iter().map(|&p| values[p]).collect();
            let scaled = transform.transform(&self.scaling.scaler_key, &slice)?;
            if scaled.len() != slice.len() {
                return Err(TransformError::WidthMismatch {
                    key: self.scaling.scaler_key.clone(),
                    expected: slice.len(),
                    actual: scaled.len(),
                }
                .into());
            }
            if scaled.iter().any(|v| !v.is_finite()) {
                return Err(TransformError::NonFinite {
                    key: self.scaling.scaler_key.clone(),
                }
                .into());
            }
            for (&p, v) in self.scaling.positions.iter().zip(scaled) {
                values[p] = v;
            }
        }

        Ok(AlignedRecord {
            columns: self.catalog.names().to_vec(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{FittedScaler, Preprocessor};
    use crate::catalog::ScalingPlan;
    use serde_json::json;

    fn aligner(names: &[&str], subset: &[&str], policy: UnknownKeyPolicy) -> FeatureAligner {
        let catalog =
            FeatureCatalog::new(names.iter().map(|s| s.to_string()).collect()).unwrap();
        let plan = ScalingPlan {
            scaler_key: "num".to_string(),
            subset: subset.iter().map(|s| s.to_string()).collect(),
        };
        let scaling = plan.resolve(&catalog).unwrap();
        FeatureAligner::new(catalog, scaling, policy)
    }

    fn doubling(width: usize) -> Preprocessor {
        Preprocessor::new().with_transformer(
            "num",
            FittedScaler::MinMax {
                min: vec![0.0; width],
                scale: vec![2.0; width],
            },
        )
    }

    fn raw(value: Value) -> RawInputRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    /// Returns one column too many
    struct WideTransform;

    impl Transform for WideTransform {
        fn width(&self, _key: &str) -> Option<usize> {
            Some(1)
        }

        fn transform(&self, _key: &str, columns: &[f64]) -> Result<Vec<f64>, TransformError> {
            let mut out = columns.to_vec();
            out.push(0.0);
            Ok(out)
        }
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value(&json!(5)), Some(5.0));
        assert_eq!(coerce_value(&json!(-2.5)), Some(-2.5));
        assert_eq!(coerce_value(&json!("5")), Some(5.0));
        assert_eq!(coerce_value(&json!(" 1e3 ")), Some(1000.0));
        assert_eq!(coerce_value(&json!(true)), Some(1.0));
        assert_eq!(coerce_value(&json!(false)), Some(0.0));
        assert_eq!(coerce_value(&json!("x")), None);
        assert_eq!(coerce_value(&json!("")), None);
        assert_eq!(coerce_value(&json!("NaN")), None);
        assert_eq!(coerce_value(&json!("inf")), None);
        assert_eq!(coerce_value(&json!(null)), None);
        assert_eq!(coerce_value(&json!([1])), None);
        assert_eq!(coerce_value(&json!({"v": 1})), None);
    }

    #[test]
    fn test_align_scales_subset_in_place() {
        let a = aligner(&["a", "b"], &["a"], UnknownKeyPolicy::Ignore);
        let record = a.align(&raw(json!({"a": "5", "b": 2})), &doubling(1)).unwrap();
        assert_eq!(record.columns(), &["a", "b"]);
        assert_eq!(record.values(), &[10.0, 2.0]);
        assert_eq!(record.get("a"), Some(10.0));
        assert_eq!(record.get("z"), None);
    }

    #[test]
    fn test_align_reorders_to_catalog() {
        let a = aligner(&["c", "a", "b"], &[], UnknownKeyPolicy::Ignore);
        let record = a
            .align(&raw(json!({"a": 1, "b": 2, "c": 3})), &Preprocessor::new())
            .unwrap();
        let order: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert_eq!(record.values(), &[3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_extra_keys_dropped() {
        let a = aligner(&["a"], &[], UnknownKeyPolicy::Ignore);
        let record = a
            .align(&raw(json!({"a": 1, "extra": 9})), &Preprocessor::new())
            .unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("extra"), None);
    }

    #[test]
    fn test_extra_keys_rejected_by_policy() {
        let a = aligner(&["a"], &[], UnknownKeyPolicy::Reject);
        assert_eq!(
            a.align(&raw(json!({"a": 1, "extra": 9})), &Preprocessor::new()),
            Err(AlignError::UnknownFeatures(vec!["extra".to_string()]))
        );
    }

    #[test]
    fn test_missing_features() {
        let a = aligner(&["a", "b", "c"], &[], UnknownKeyPolicy::Ignore);
        assert_eq!(
            a.align(&raw(json!({"b": 2})), &Preprocessor::new()),
            Err(AlignError::MissingFeatures(vec![
                "a".to_string(),
                "c".to_string()
            ]))
        );
    }

    #[test]
    fn test_non_numeric_checked_before_presence() {
        let a = aligner(&["a", "b"], &[], UnknownKeyPolicy::Ignore);
        // "a" is missing, but the bad value for "b" is reported first
        let err = a
            .align(&raw(json!({"b": "x"})), &Preprocessor::new())
            .unwrap_err();
        assert!(matches!(err, AlignError::NonNumericValue { ref feature, .. } if feature == "b"));
    }

    #[test]
    fn test_non_numeric_extra_key_fails() {
        let a = aligner(&["a"], &[], UnknownKeyPolicy::Ignore);
        let err = a
            .align(&raw(json!({"a": 1, "note": "hello"})), &Preprocessor::new())
            .unwrap_err();
        assert!(matches!(err, AlignError::NonNumericValue { .. }));
    }

    #[test]
    fn test_transform_failure_surfaces() {
        let a = aligner(&["a"], &["a"], UnknownKeyPolicy::Ignore);
        let err = a
            .align(&raw(json!({"a": 1})), &Preprocessor::new())
            .unwrap_err();
        assert_eq!(
            err,
            AlignError::Transform(TransformError::UnknownTransformer("num".to_string()))
        );
    }

    #[test]
    fn test_transform_output_width_checked() {
        let a = aligner(&["a", "b"], &["b"], UnknownKeyPolicy::Ignore);
        let err = a
            .align(&raw(json!({"a": 1, "b": 2})), &WideTransform)
            .unwrap_err();
        assert!(matches!(
            err,
            AlignError::Transform(TransformError::WidthMismatch {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_overflowing_scale_is_rejected() {
        let a = aligner(&["a", "b"], &["a"], UnknownKeyPolicy::Ignore);
        let tiny = Preprocessor::new().with_transformer(
            "num",
            FittedScaler::Robust {
                center: vec![0.0],
                scale: vec![1e-10],
            },
        );
        let err = a
            .align(&raw(json!({"a": 1e300, "b": -1e308})), &tiny)
            .unwrap_err();
        assert_eq!(
            err,
            AlignError::Transform(TransformError::NonFinite {
                key: "num".to_string()
            })
        );

        // Unscaled columns are only bounded by coercion
        let ok = a.align(&raw(json!({"a": 0.0, "b": -1e308})), &tiny).unwrap();
        assert_eq!(ok.values(), &[0.0, -1e308]);
    }

    #[test]
    fn test_aligned_record_serializes_in_order() {
        let a = aligner(&["z", "a"], &[], UnknownKeyPolicy::Ignore);
        let record = a
            .align(&raw(json!({"a": 1, "z": 2})), &Preprocessor::new())
            .unwrap();
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"z":2.0,"a":1.0}"#);
    }
}
