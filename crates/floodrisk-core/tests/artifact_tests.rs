//! Artifact loading integration tests

use std::fs;
use std::path::Path;

use floodrisk_core::{
    ArtifactError, ArtifactPaths, ArtifactSet, Classifier, PredictionContext, RiskLevel,
    ScalingPlan, ServerConfig, UnknownKeyPolicy,
};
use serde_json::json;
use tempfile::TempDir;

const FEATURES: &str = r#"["code_departement", "pluie_24h", "humidite"]"#;

const PREPROCESSOR: &str = r#"{
    "transformers": {
        "num": { "kind": "robust", "center": [2.0, 70.0], "scale": [4.0, 20.0] },
        "all": { "kind": "standard", "mean": [50.0, 2.0, 70.0], "scale": [25.0, 4.0, 20.0] }
    }
}"#;

/// Splits on scaled rainfall: heavy rain is high risk
const FOREST: &str = r#"{
    "kind": "forest",
    "n_features": 3,
    "classes": [0, 1],
    "trees": [
        { "nodes": [
            { "type": "split", "feature": 1, "threshold": 1.0, "left": 1, "right": 2 },
            { "type": "leaf", "value": [20.0, 2.0] },
            { "type": "leaf", "value": [3.0, 15.0] }
        ] },
        { "nodes": [
            { "type": "split", "feature": 2, "threshold": 0.5, "left": 1, "right": 2 },
            { "type": "leaf", "value": [8.0, 2.0] },
            { "type": "leaf", "value": [1.0, 9.0] }
        ] }
    ]
}"#;

fn write_artifacts(dir: &Path, features: &str, preprocessor: &str, model: &str) {
    fs::write(dir.join("feature_names.json"), features).unwrap();
    fs::write(dir.join("preprocessor.json"), preprocessor).unwrap();
    fs::write(dir.join("model.json"), model).unwrap();
}

fn plan(key: &str, subset: &[&str]) -> ScalingPlan {
    ScalingPlan {
        scaler_key: key.to_string(),
        subset: subset.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn test_load_and_predict() {
    let dir = TempDir::new().unwrap();
    write_artifacts(dir.path(), FEATURES, PREPROCESSOR, FOREST);

    let artifacts = ArtifactSet::load(&ArtifactPaths::in_dir(dir.path())).unwrap();
    assert_eq!(artifacts.catalog.len(), 3);
    assert_eq!(artifacts.model.n_features(), 3);

    let ctx = PredictionContext::from_artifacts(
        artifacts,
        &plan("num", &["pluie_24h", "humidite"]),
        UnknownKeyPolicy::Ignore,
    )
    .unwrap();

    // pluie (30 - 2) / 4 = 7, humidite (95 - 70) / 20 = 1.25: both trees vote high
    let wet = json!({"code_departement": 31, "pluie_24h": "30", "humidite": 95});
    let result = ctx.predict(wet.as_object().unwrap()).unwrap();
    assert_eq!(result.label, 1);
    assert_eq!(result.risk, RiskLevel::High);

    let dry = json!({"code_departement": 31, "pluie_24h": 0, "humidite": 40});
    let result = ctx.predict(dry.as_object().unwrap()).unwrap();
    assert_eq!(result.label, 0);
    assert_eq!(result.annotation(), "low risk");
}

#[test]
fn test_alternate_scaler_key_over_all_columns() {
    let dir = TempDir::new().unwrap();
    write_artifacts(dir.path(), FEATURES, PREPROCESSOR, FOREST);
    let artifacts = ArtifactSet::load(&ArtifactPaths::in_dir(dir.path())).unwrap();

    let ctx = PredictionContext::from_artifacts(
        artifacts,
        &plan("all", &["code_departement", "pluie_24h", "humidite"]),
        UnknownKeyPolicy::Ignore,
    )
    .unwrap();

    let raw = json!({"code_departement": 75, "pluie_24h": 6, "humidite": 80});
    let aligned = ctx.align(raw.as_object().unwrap()).unwrap();
    assert_eq!(aligned.values(), &[1.0, 1.0, 0.5]);
}

#[test]
fn test_load_through_config() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("v2")).unwrap();
    write_artifacts(&dir.path().join("v2"), FEATURES, PREPROCESSOR, FOREST);

    let config_path = dir.path().join("floodrisk.toml");
    fs::write(
        &config_path,
        format!(
            r#"
            [artifacts]
            dir = {:?}

            [scaling]
            scaler_key = "num"
            subset = ["pluie_24h", "humidite"]
            "#,
            dir.path().join("v2")
        ),
    )
    .unwrap();

    let config = ServerConfig::load(&config_path).unwrap();
    assert!(config.validate().is_ok());
    let artifacts = ArtifactSet::load(&config.artifacts.paths()).unwrap();
    assert_eq!(artifacts.catalog.names()[1], "pluie_24h");
}

#[test]
fn test_malformed_json_is_parse_error() {
    let dir = TempDir::new().unwrap();
    write_artifacts(dir.path(), "[\"a\",", PREPROCESSOR, FOREST);
    let err = ArtifactSet::load(&ArtifactPaths::in_dir(dir.path())).unwrap_err();
    assert!(matches!(err, ArtifactError::Parse { .. }));
}

#[test]
fn test_duplicate_feature_rejected() {
    let dir = TempDir::new().unwrap();
    write_artifacts(dir.path(), r#"["a", "a"]"#, PREPROCESSOR, FOREST);
    let err = ArtifactSet::load(&ArtifactPaths::in_dir(dir.path())).unwrap_err();
    assert!(matches!(err, ArtifactError::DuplicateFeature(name) if name == "a"));
}

#[test]
fn test_inconsistent_model_rejected() {
    let dir = TempDir::new().unwrap();
    let model = r#"{
        "kind": "forest",
        "n_features": 3,
        "classes": [0, 1],
        "trees": [{ "nodes": [{ "type": "leaf", "value": [1.0] }] }]
    }"#;
    write_artifacts(dir.path(), FEATURES, PREPROCESSOR, model);
    let err = ArtifactSet::load(&ArtifactPaths::in_dir(dir.path())).unwrap_err();
    assert!(matches!(err, ArtifactError::Invalid(_)));
}
