//! Encoding Error Types

use thiserror::Error;

/// Errors raised while building manifests, encoding records or scaling
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncodingError {
    /// Manifest contains the same column twice
    #[error("Duplicate manifest column: {0}")]
    DuplicateColumn(String),

    /// Manifest has no columns
    #[error("Feature manifest is empty")]
    EmptyManifest,

    /// No rows to fit on
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Width of the input does not match the fitted width
    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
