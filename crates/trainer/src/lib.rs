//! Fraud Model Trainer
//!
//! Offline batch job producing the artifacts the scoring service loads:
//! feature manifest, standard scaler, gradient boosted trees and oblivious
//! boosting models, plus a metadata summary.

pub mod config;
mod dataset;
mod error;
mod memory;
mod pipeline;

pub use crate::config::{ManifestStrategy, TrainerConfig};
pub use dataset::{read_all, ChunkedReader};
pub use error::TrainingError;
pub use memory::MemoryMonitor;
pub use pipeline::{
    derive_manifest, encode_chunked, encode_single_pass, EncodedDataset, TrainingPipeline,
    TrainingReport,
};
