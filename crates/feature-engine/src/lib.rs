//! Feature Engineering Engine
//!
//! Shared by training and inference: transaction records, the feature
//! manifest, one-hot encoding aligned to that manifest, and standard scaling.

mod encoder;
mod error;
mod manifest;
mod record;
mod scaler;

pub use encoder::FeatureEncoder;
pub use error::EncodingError;
pub use manifest::{CategoryVocabulary, FeatureManifest};
pub use record::{CategoricalField, LabeledTransaction, TransactionRecord, NUMERIC_COLUMNS};
pub use scaler::StandardScaler;
