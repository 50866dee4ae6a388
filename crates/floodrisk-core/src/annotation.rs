//! Human-readable annotation of model labels

use serde::{Deserialize, Serialize};

/// Risk level derived from the classifier's integer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    High,
    Unknown,
}

impl RiskLevel {
    /// Total over the integer domain
    pub fn from_label(label: i64) -> Self {
        match label {
            0 => RiskLevel::Low,
            1 => RiskLevel::High,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn annotation(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low risk",
            RiskLevel::High => "high risk",
            RiskLevel::Unknown => "unknown risk level",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.annotation())
    }
}

/// Outcome of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionResult {
    pub label: i64,
    pub risk: RiskLevel,
}

impl PredictionResult {
    pub fn new(label: i64) -> Self {
        Self {
            label,
            risk: RiskLevel::from_label(label),
        }
    }

    pub fn annotation(&self) -> &'static str {
        self.risk.annotation()
    }
}
