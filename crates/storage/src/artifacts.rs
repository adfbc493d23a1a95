//! Artifact Store
//!
//! Layout relative to the models directory:
//!
//! | File                 | Content                            |
//! |----------------------|------------------------------------|
//! | `gbt_model.bin`      | gradient boosted trees (postcard)  |
//! | `oblivious_model.bin`| oblivious boosting (postcard)      |
//! | `scaler.json`        | standard scaler parameters         |
//! | `feature_names.json` | feature manifest, ordered columns  |
//! | `metadata.json`      | training summary (optional)        |

use crate::metadata::ModelMetadata;
use crate::StorageError;
use boosting::{Classifier, GradientBoostedTrees, ModelKind, ObliviousBoosting};
use feature_engine::{FeatureManifest, StandardScaler};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const GBT_MODEL_FILE: &str = "gbt_model.bin";
pub const OBLIVIOUS_MODEL_FILE: &str = "oblivious_model.bin";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Reads and writes training artifacts under one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root` (nothing is touched on disk)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the models directory if missing
    pub fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
            path: self.root.clone(),
            source,
        })
    }

    /// Path of a file inside the store
    pub fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// Path of a classifier artifact
    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        match kind {
            ModelKind::GradientBoostedTrees => self.path(GBT_MODEL_FILE),
            ModelKind::ObliviousBoosting => self.path(OBLIVIOUS_MODEL_FILE),
        }
    }

    /// Required artifacts that do not exist yet
    pub fn missing_artifacts(&self) -> Vec<PathBuf> {
        [GBT_MODEL_FILE, OBLIVIOUS_MODEL_FILE, SCALER_FILE, FEATURE_NAMES_FILE]
            .iter()
            .map(|file| self.path(file))
            .filter(|path| !path.exists())
            .collect()
    }

    pub fn save_scaler(&self, scaler: &StandardScaler) -> Result<(), StorageError> {
        self.write_json(SCALER_FILE, scaler)?;
        info!("Saved scaler ({} features)", scaler.n_features());
        Ok(())
    }

    pub fn load_scaler(&self) -> Result<StandardScaler, StorageError> {
        self.read_json(SCALER_FILE)
    }

    pub fn save_manifest(&self, manifest: &FeatureManifest) -> Result<(), StorageError> {
        self.write_json(FEATURE_NAMES_FILE, manifest)?;
        info!("Saved feature manifest ({} columns)", manifest.len());
        Ok(())
    }

    pub fn load_manifest(&self) -> Result<FeatureManifest, StorageError> {
        self.read_json(FEATURE_NAMES_FILE)
    }

    /// Persist a fitted classifier at the path for its kind
    pub fn save_model<C: Classifier>(&self, model: &C) -> Result<(), StorageError> {
        model.save(&self.model_path(model.kind()))?;
        Ok(())
    }

    pub fn load_gbt(&self) -> Result<GradientBoostedTrees, StorageError> {
        self.load_model(ModelKind::GradientBoostedTrees)
    }

    pub fn load_oblivious(&self) -> Result<ObliviousBoosting, StorageError> {
        self.load_model(ModelKind::ObliviousBoosting)
    }

    fn load_model<C: Classifier>(&self, kind: ModelKind) -> Result<C, StorageError> {
        let path = self.model_path(kind);
        if !path.exists() {
            return Err(StorageError::NotFound(path));
        }
        let model = C::load(&path)?;
        info!("Loaded {} model from {}", kind.display_name(), path.display());
        Ok(model)
    }

    pub fn save_metadata(&self, metadata: &ModelMetadata) -> Result<(), StorageError> {
        self.write_json(METADATA_FILE, metadata)
    }

    /// Training metadata, `None` when the file is absent
    pub fn load_metadata(&self) -> Result<Option<ModelMetadata>, StorageError> {
        match self.read_json(METADATA_FILE) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(StorageError::NotFound(path)) => {
                warn!("No training metadata at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), StorageError> {
        self.ensure_dir()?;
        let path = self.path(file);
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        let handle = File::create(&path).map_err(io_err)?;
        let mut writer = BufWriter::new(handle);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        writer.flush().map_err(io_err)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T, StorageError> {
        let path = self.path(file);
        let handle = match File::open(&path) {
            Ok(handle) => handle,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path))
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_reader(BufReader::new(handle))
            .map_err(|source| StorageError::Json { path, source })
    }
}
