//! Training Error Types

use boosting::BoostingError;
use feature_engine::EncodingError;
use std::path::PathBuf;
use storage::StorageError;
use thiserror::Error;

/// Any failure that aborts a training run
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Failed to read dataset {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Dataset {} has no rows", .0.display())]
    EmptyDataset(PathBuf),
    #[error("Feature matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Feature encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Model training failed: {0}")]
    Boosting(#[from] BoostingError),
    #[error("Saving artifacts failed: {0}")]
    Storage(#[from] StorageError),
}
