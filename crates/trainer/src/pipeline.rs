//! Training Pipeline
//!
//! 1. Derive the feature manifest from the training file.
//! 2. Stream the training file in chunks, encoding each chunk against the
//!    manifest into one flat row-major buffer.
//! 3. Encode the test file in a single pass against the same manifest.
//! 4. Fit the scaler on the training matrix, scale both matrices.
//! 5. Fit both classifiers with the test set as the early-stopping set.
//! 6. Persist scaler, manifest, both models and the run metadata.

use crate::config::{ManifestStrategy, TrainerConfig};
use crate::dataset::{read_all, ChunkedReader};
use crate::error::TrainingError;
use crate::memory::MemoryMonitor;
use boosting::{Classifier, EvalSet, GradientBoostedTrees, ObliviousBoosting};
use chrono::Utc;
use feature_engine::{
    CategoryVocabulary, FeatureEncoder, FeatureManifest, LabeledTransaction, StandardScaler,
};
use ndarray::{Array1, Array2, ArrayViewMut1};
use std::path::Path;
use storage::{ArtifactStore, ModelMetadata, ModelSummary};
use tracing::{debug, info};

/// Encoded features and labels of one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
}

impl EncodedDataset {
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    /// Fraction of rows labeled as fraud
    pub fn fraud_rate(&self) -> f64 {
        if self.labels.is_empty() {
            0.0
        } else {
            self.labels.sum() / self.labels.len() as f64
        }
    }
}

/// Outcome of a full training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub metadata: ModelMetadata,
}

/// Derive the feature manifest from the training file
pub fn derive_manifest(
    path: &Path,
    chunk_size: usize,
    strategy: ManifestStrategy,
) -> Result<FeatureManifest, TrainingError> {
    let mut vocabulary = CategoryVocabulary::new();
    let mut reader = ChunkedReader::open(path, chunk_size)?;

    match strategy {
        ManifestStrategy::Vocabulary => {
            while let Some(chunk) = reader.next_chunk()? {
                let mut partial = CategoryVocabulary::new();
                for row in &chunk {
                    partial.observe(&row.record);
                }
                vocabulary.merge(partial);
            }
        }
        ManifestStrategy::FirstChunk => {
            if let Some(chunk) = reader.next_chunk()? {
                for row in &chunk {
                    vocabulary.observe(&row.record);
                }
            }
        }
    }

    if reader.rows_read() == 0 {
        return Err(TrainingError::EmptyDataset(path.to_path_buf()));
    }

    let manifest = vocabulary.to_manifest()?;
    info!(
        "Derived feature manifest with {} columns ({} strategy, {} rows scanned)",
        manifest.len(),
        strategy,
        reader.rows_read()
    );
    Ok(manifest)
}

/// Encode `rows` onto the end of a flat row-major buffer
fn append_encoded(
    rows: &[LabeledTransaction],
    encoder: &FeatureEncoder,
    values: &mut Vec<f64>,
    labels: &mut Vec<f64>,
) {
    let width = encoder.feature_count();
    values.reserve(rows.len() * width);
    labels.reserve(rows.len());
    for row in rows {
        let start = values.len();
        values.resize(start + width, 0.0);
        encoder.encode_into(&row.record, ArrayViewMut1::from(&mut values[start..]));
        labels.push(row.label());
    }
}

/// Stream `path` in chunks and encode every row against `encoder`
pub fn encode_chunked(
    path: &Path,
    encoder: &FeatureEncoder,
    chunk_size: usize,
) -> Result<EncodedDataset, TrainingError> {
    let width = encoder.feature_count();
    let mut memory = MemoryMonitor::new();
    let mut values: Vec<f64> = Vec::new();
    let mut labels: Vec<f64> = Vec::new();
    let mut reader = ChunkedReader::open(path, chunk_size)?;

    let mut chunk_index = 0;
    while let Some(chunk) = reader.next_chunk()? {
        append_encoded(&chunk, encoder, &mut values, &mut labels);
        debug!(
            "Encoded chunk {}: {} rows, running shape ({}, {})",
            chunk_index,
            chunk.len(),
            labels.len(),
            width
        );
        memory.log_debug(&format!("chunk {}", chunk_index));
        chunk_index += 1;
    }

    if labels.is_empty() {
        return Err(TrainingError::EmptyDataset(path.to_path_buf()));
    }

    let features = Array2::from_shape_vec((labels.len(), width), values)?;
    info!(
        "Encoded {} in {} chunks: {} rows x {} features",
        path.display(),
        chunk_index,
        features.nrows(),
        features.ncols()
    );

    Ok(EncodedDataset {
        features,
        labels: Array1::from(labels),
    })
}

/// Read and encode `path` in a single pass
pub fn encode_single_pass(
    path: &Path,
    encoder: &FeatureEncoder,
) -> Result<EncodedDataset, TrainingError> {
    let rows = read_all(path)?;
    if rows.is_empty() {
        return Err(TrainingError::EmptyDataset(path.to_path_buf()));
    }

    let mut values = Vec::new();
    let mut labels = Vec::new();
    append_encoded(&rows, encoder, &mut values, &mut labels);
    drop(rows);

    let features = Array2::from_shape_vec((labels.len(), encoder.feature_count()), values)?;
    info!(
        "Encoded {} in one pass: {} rows x {} features",
        path.display(),
        features.nrows(),
        features.ncols()
    );

    Ok(EncodedDataset {
        features,
        labels: Array1::from(labels),
    })
}

/// End-to-end training job
pub struct TrainingPipeline {
    config: TrainerConfig,
    store: ArtifactStore,
}

impl TrainingPipeline {
    pub fn new(config: TrainerConfig) -> Self {
        let store = ArtifactStore::new(config.output.models_dir.clone());
        Self { config, store }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run every stage; any error aborts the run
    pub fn run(&self) -> Result<TrainingReport, TrainingError> {
        let data = &self.config.data;
        self.store.ensure_dir()?;
        let mut memory = MemoryMonitor::new();
        memory.log("startup");

        info!("Deriving feature manifest from {}", data.train_path.display());
        let manifest = derive_manifest(&data.train_path, data.chunk_size, data.manifest_strategy)?;
        let encoder = FeatureEncoder::new(manifest.clone());
        memory.log("manifest derivation");

        info!(
            "Loading training data from {} in chunks of {} rows",
            data.train_path.display(),
            data.chunk_size
        );
        let mut train = encode_chunked(&data.train_path, &encoder, data.chunk_size)?;
        memory.log("training set encoding");
        info!("Loading test data from {}", data.test_path.display());
        let mut test = encode_single_pass(&data.test_path, &encoder)?;
        memory.log("test set encoding");
        info!(
            "Fraud rate: train {:.4}%, test {:.4}%",
            train.fraud_rate() * 100.0,
            test.fraud_rate() * 100.0
        );

        let scaler = StandardScaler::fit(train.features.view())?;
        scaler.transform_inplace(&mut train.features)?;
        scaler.transform_inplace(&mut test.features)?;
        memory.log("scaling");

        let eval = EvalSet {
            features: test.features.view(),
            labels: test.labels.view(),
        };

        let mut gbt = GradientBoostedTrees::new(self.config.gbt.clone());
        let gbt_summary = Self::fit_model(&mut gbt, &train, eval)?;
        memory.log("gradient boosted trees training");
        let mut oblivious = ObliviousBoosting::new(self.config.oblivious.clone());
        let oblivious_summary = Self::fit_model(&mut oblivious, &train, eval)?;
        memory.log("oblivious boosting training");

        self.store.save_scaler(&scaler)?;
        self.store.save_manifest(&manifest)?;
        self.store.save_model(&gbt)?;
        self.store.save_model(&oblivious)?;

        let metadata = ModelMetadata {
            trained_at: Utc::now(),
            feature_count: manifest.len(),
            train_rows: train.n_rows(),
            test_rows: test.n_rows(),
            manifest_strategy: data.manifest_strategy.to_string(),
            models: vec![gbt_summary, oblivious_summary],
        };
        self.store.save_metadata(&metadata)?;
        info!("All artifacts written to {}", self.store.root().display());

        Ok(TrainingReport { metadata })
    }

    fn fit_model<C: Classifier>(
        model: &mut C,
        train: &EncodedDataset,
        eval: EvalSet<'_>,
    ) -> Result<ModelSummary, TrainingError> {
        let kind = model.kind();
        info!("Training {} model...", kind.display_name());
        let report = model.fit(train.features.view(), train.labels.view(), Some(eval))?;
        let accuracy = model.score(eval.features, eval.labels)?;
        info!(
            "{} accuracy: {:.4} ({} trees, best iteration {:?})",
            kind.display_name(),
            accuracy,
            report.trees_kept,
            report.best_iteration
        );

        Ok(ModelSummary {
            kind,
            model_type: kind.display_name().to_string(),
            accuracy,
            trees: report.trees_kept,
            best_iteration: report.best_iteration,
        })
    }
}
