//! Storage Layer
//!
//! Persists and restores the training artifacts at fixed paths relative to a
//! models directory.

mod artifacts;
mod metadata;

pub use artifacts::{
    ArtifactStore, FEATURE_NAMES_FILE, GBT_MODEL_FILE, METADATA_FILE, OBLIVIOUS_MODEL_FILE,
    SCALER_FILE,
};
pub use metadata::{ModelMetadata, ModelSummary};

use boosting::BoostingError;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Model artifact error: {0}")]
    Model(#[from] BoostingError),
}
