//! Boosting Error Types

use crate::ModelKind;
use thiserror::Error;

/// Errors raised while fitting, scoring or persisting a classifier
#[derive(Debug, Error)]
pub enum BoostingError {
    #[error("Empty training data")]
    EmptyData,
    #[error("Feature matrix has {rows} rows but {labels} labels were given")]
    LabelCountMismatch { rows: usize, labels: usize },
    #[error("Invalid input shape: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Labels must be 0 or 1, got {0}")]
    InvalidLabel(f64),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Model has not been fitted")]
    NotFitted,
    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },
    #[error("Model file holds a {found} model, expected {expected}")]
    WrongModelKind { found: ModelKind, expected: ModelKind },
    #[error("Model I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Model serialization failed: {0}")]
    Serialization(#[from] postcard::Error),
}
