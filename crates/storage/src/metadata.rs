//! Training Metadata

use boosting::ModelKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of training one classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub kind: ModelKind,
    /// Human readable algorithm name
    pub model_type: String,
    /// Accuracy on the held-out test set
    pub accuracy: f64,
    /// Trees in the persisted model
    pub trees: usize,
    /// Best validation round when early stopping was active
    pub best_iteration: Option<usize>,
}

/// Summary written next to the model artifacts after a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub feature_count: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// How the feature manifest was derived
    pub manifest_strategy: String,
    pub models: Vec<ModelSummary>,
}

impl ModelMetadata {
    /// Summary of one model, if it was recorded
    pub fn model(&self, kind: ModelKind) -> Option<&ModelSummary> {
        self.models.iter().find(|m| m.kind == kind)
    }

    /// Accuracy formatted as a percentage string, e.g. `"98.83%"`
    pub fn accuracy_label(&self, kind: ModelKind) -> Option<String> {
        self.model(kind).map(|m| format!("{:.2}%", m.accuracy * 100.0))
    }

    /// Training date as `YYYY-MM-DD`
    pub fn last_updated(&self) -> String {
        self.trained_at.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata() -> ModelMetadata {
        ModelMetadata {
            trained_at: Utc.with_ymd_and_hms(2025, 5, 4, 12, 30, 0).unwrap(),
            feature_count: 1215,
            train_rows: 1_296_675,
            test_rows: 555_719,
            manifest_strategy: "vocabulary".to_string(),
            models: vec![ModelSummary {
                kind: ModelKind::GradientBoostedTrees,
                model_type: ModelKind::GradientBoostedTrees.display_name().to_string(),
                accuracy: 0.98834,
                trees: 50,
                best_iteration: Some(49),
            }],
        }
    }

    #[test]
    fn test_accuracy_label() {
        let meta = metadata();
        assert_eq!(
            meta.accuracy_label(ModelKind::GradientBoostedTrees).as_deref(),
            Some("98.83%")
        );
        assert!(meta.accuracy_label(ModelKind::ObliviousBoosting).is_none());
    }

    #[test]
    fn test_last_updated() {
        assert_eq!(metadata().last_updated(), "2025-05-04");
    }
}
