//! Trainer Configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `FRAUD_`-prefixed environment variables using `__` between
//! nested keys (e.g. `FRAUD_DATA__CHUNK_SIZE=50000`).

use anyhow::{Context, Result};
use boosting::{GbtParams, ObliviousParams};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default location of the trainer config file
pub const DEFAULT_CONFIG_PATH: &str = "config/train.toml";

/// How the feature manifest is derived from the training file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestStrategy {
    /// Full pass over the training file collecting every category value
    #[default]
    Vocabulary,
    /// Categories present in the first chunk only
    FirstChunk,
}

impl ManifestStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestStrategy::Vocabulary => "vocabulary",
            ManifestStrategy::FirstChunk => "first-chunk",
        }
    }
}

impl fmt::Display for ManifestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Training pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub data: DataConfig,
    pub output: OutputConfig,
    pub gbt: GbtParams,
    pub oblivious: ObliviousParams,
    pub logging: LoggingConfig,
}

/// Input datasets and ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Training CSV
    pub train_path: PathBuf,
    /// Held-out CSV used for early stopping and accuracy
    pub test_path: PathBuf,
    /// Rows per chunk when streaming the training file
    pub chunk_size: usize,
    pub manifest_strategy: ManifestStrategy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("data/fraudTrain.csv"),
            test_path: PathBuf::from("data/fraudTest.csv"),
            chunk_size: 25_000,
            manifest_strategy: ManifestStrategy::Vocabulary,
        }
    }
}

/// Artifact destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub models_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
        }
    }
}

/// Log output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TrainerConfig {
    /// Load from `path`, or from the default location when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&TrainerConfig::default())
            .context("Failed to encode default configuration")?;

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let config = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix("FRAUD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: TrainerConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.data.chunk_size == 0 {
            anyhow::bail!("data.chunk_size must be positive");
        }
        self.gbt.validate().context("Invalid gbt parameters")?;
        self.oblivious
            .validate()
            .context("Invalid oblivious parameters")?;
        Ok(())
    }
}
