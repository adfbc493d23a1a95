//! Fraud Model Training CLI

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trainer::config::LogFormat;
use trainer::{ManifestStrategy, TrainerConfig, TrainingPipeline};

#[derive(Parser, Debug)]
#[command(name = "fraud-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the fraud scoring models from transaction CSVs", long_about = None)]
struct Args {
    /// Config file (defaults to config/train.toml when present, or $FRAUD_CONFIG)
    #[arg(short, long, env = "FRAUD_CONFIG")]
    config: Option<PathBuf>,

    /// Training dataset CSV
    #[arg(long)]
    train: Option<PathBuf>,

    /// Test dataset CSV
    #[arg(long)]
    test: Option<PathBuf>,

    /// Output directory for model artifacts
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rows per training chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// How the feature manifest is derived
    #[arg(long, value_enum)]
    manifest_strategy: Option<ManifestStrategy>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config, args.verbose) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Training failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<TrainerConfig> {
    let mut config = TrainerConfig::load(args.config.as_deref())?;
    if let Some(train) = &args.train {
        config.data.train_path = train.clone();
    }
    if let Some(test) = &args.test {
        config.data.test_path = test.clone();
    }
    if let Some(output) = &args.output {
        config.output.models_dir = output.clone();
    }
    if let Some(chunk_size) = args.chunk_size {
        config.data.chunk_size = chunk_size;
    }
    if let Some(strategy) = args.manifest_strategy {
        config.data.manifest_strategy = strategy;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &TrainerConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match config.logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

fn run(config: TrainerConfig) -> Result<()> {
    info!("Fraud Model Trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════");
    info!("  Train data: {}", config.data.train_path.display());
    info!("  Test data: {}", config.data.test_path.display());
    info!("  Models dir: {}", config.output.models_dir.display());
    info!("  Chunk size: {}", config.data.chunk_size);
    info!("  Manifest strategy: {}", config.data.manifest_strategy);

    let report = TrainingPipeline::new(config)
        .run()
        .context("Training pipeline failed")?;

    info!("═══════════════════════════════════════════");
    info!("✓ Training completed successfully");
    for model in &report.metadata.models {
        info!("  {} accuracy: {:.4}", model.model_type, model.accuracy);
    }
    info!("  Features: {}", report.metadata.feature_count);
    Ok(())
}
