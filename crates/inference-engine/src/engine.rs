//! Ensemble Predictor
//!
//! Scores a scaled feature row with both classifiers and averages the two
//! class-1 probabilities.

use crate::InferenceError;
use boosting::Classifier;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Scores strictly above this are flagged as fraud
pub const FRAUD_THRESHOLD: f64 = 0.5;

/// Coarse risk bucket for an ensembled score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// `< 0.3` Low, `< 0.7` Medium, otherwise High
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            RiskLevel::Low
        } else if score < 0.7 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePrediction {
    /// Ensembled fraud probability
    pub prediction: f64,
    /// Gradient boosted trees probability
    pub gbt_prediction: f64,
    /// Oblivious boosting probability
    pub oblivious_prediction: f64,
    pub is_fraud: bool,
    pub risk_level: RiskLevel,
}

impl EnsemblePrediction {
    /// Combine two per-model probabilities
    pub fn from_scores(gbt_prediction: f64, oblivious_prediction: f64) -> Self {
        let prediction = (gbt_prediction + oblivious_prediction) / 2.0;
        Self {
            prediction,
            gbt_prediction,
            oblivious_prediction,
            is_fraud: prediction > FRAUD_THRESHOLD,
            risk_level: RiskLevel::from_score(prediction),
        }
    }
}

/// Two independently trained classifiers averaged with equal weight
pub struct EnsemblePredictor {
    gbt: Box<dyn Classifier>,
    oblivious: Box<dyn Classifier>,
}

impl EnsemblePredictor {
    /// Pair two classifiers; both must expect the same row width
    pub fn new(
        gbt: Box<dyn Classifier>,
        oblivious: Box<dyn Classifier>,
    ) -> Result<Self, InferenceError> {
        if gbt.n_features() != oblivious.n_features() {
            return Err(InferenceError::FeatureMismatch {
                component: "oblivious model",
                expected: gbt.n_features(),
                actual: oblivious.n_features(),
            });
        }
        Ok(Self { gbt, oblivious })
    }

    /// Row width both models expect
    pub fn n_features(&self) -> usize {
        self.gbt.n_features()
    }

    /// Score one scaled feature row
    pub fn predict(&self, row: ArrayView1<f64>) -> Result<EnsemblePrediction, InferenceError> {
        let gbt = self.gbt.predict_proba_row(row)?;
        let oblivious = self.oblivious.predict_proba_row(row)?;
        let result = EnsemblePrediction::from_scores(gbt, oblivious);
        debug!(
            "Ensemble scored {:.4} (gbt {:.4}, oblivious {:.4})",
            result.prediction, gbt, oblivious
        );
        Ok(result)
    }
}
