//! Fraud Scoring Service - Main Entry Point

use anyhow::{Context, Result};
use api::{init_logging, run_server, ServiceConfig};
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var_os("FRAUD_CONFIG").map(PathBuf::from);
    let config = ServiceConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging.level, config.logging.format)?;

    info!("=== Fraud Scoring Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Models directory: {}", config.models.models_dir.display());

    if let Err(e) = run_server(config).await {
        error!("Service stopped: {:#}", e);
        return Err(e);
    }
    Ok(())
}
