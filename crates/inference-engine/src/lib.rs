//! Fraud Inference Engine
//!
//! Turns a raw transaction into an ensembled fraud probability: manifest
//! encoding, frozen standard scaling, two boosted classifiers, averaging.

mod engine;
mod scorer;

pub use engine::{EnsemblePrediction, EnsemblePredictor, RiskLevel, FRAUD_THRESHOLD};
pub use scorer::FraudScorer;

use boosting::BoostingError;
use feature_engine::EncodingError;
use storage::StorageError;
use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Artifact load failed: {0}")]
    ArtifactLoad(#[from] StorageError),
    #[error("Artifact mismatch: {component} expects {actual} features, manifest has {expected}")]
    FeatureMismatch {
        component: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Feature encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Prediction failed: {0}")]
    Prediction(#[from] BoostingError),
}
