//! Fraud Scoring API Server
//!
//! HTTP front end over the fraud scorer: health and model information
//! endpoints, single-transaction prediction and Prometheus metrics.

use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use boosting::ModelKind;
use data_validator::Validator;
use inference_engine::FraudScorer;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use storage::{ArtifactStore, ModelMetadata};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod routes;

pub use crate::config::ServiceConfig;
pub use error::ApiError;

use crate::config::{CorsConfig, LogFormat, ModelInfoConfig};
use routes::info::{ModelDescription, ModelDescriptions, ModelInfoResponse};

/// Application state shared across handlers, read-only after startup
pub struct AppState {
    /// Manifest encoder, scaler and both classifiers
    pub scorer: Arc<FraudScorer>,
    /// Request validator
    pub validator: Validator,
    /// Precomputed `/model-info` body
    pub model_info: ModelInfoResponse,
    /// Prometheus handle, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        scorer: Arc<FraudScorer>,
        metadata: Option<&ModelMetadata>,
        fallback: &ModelInfoConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let model_info = build_model_info(scorer.feature_count(), metadata, fallback);
        Self {
            scorer,
            validator: Validator::default(),
            model_info,
            metrics,
        }
    }

    /// Replace the default request validator
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }
}

/// Describe the models from training metadata, falling back to configured values
fn build_model_info(
    features_expected: usize,
    metadata: Option<&ModelMetadata>,
    fallback: &ModelInfoConfig,
) -> ModelInfoResponse {
    let describe = |kind: ModelKind, default_accuracy: &str| ModelDescription {
        model_type: kind.display_name().to_string(),
        accuracy: metadata
            .and_then(|m| m.accuracy_label(kind))
            .unwrap_or_else(|| default_accuracy.to_string()),
    };

    ModelInfoResponse {
        models: ModelDescriptions {
            gbt: describe(ModelKind::GradientBoostedTrees, &fallback.gbt_accuracy),
            oblivious: describe(ModelKind::ObliviousBoosting, &fallback.oblivious_accuracy),
        },
        ensemble_method: "Average of probabilities".to_string(),
        features_expected,
        last_updated: metadata
            .map(ModelMetadata::last_updated)
            .unwrap_or_else(|| fallback.last_updated.clone()),
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(routes::info::root))
        .route("/health", get(routes::info::health))
        .route("/model-info", get(routes::info::model_info))
        .route("/predict", post(routes::predict::predict))
        .route("/metrics", get(routes::telemetry::metrics))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Initialize logging; `RUST_LOG` overrides `level`
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

/// Load artifacts and serve until the process is stopped
pub async fn run_server(config: ServiceConfig) -> Result<()> {
    let store = ArtifactStore::new(config.models.models_dir.clone());
    for missing in store.missing_artifacts() {
        warn!("Missing artifact: {}", missing.display());
    }

    let scorer = FraudScorer::from_store(&store).context("Failed to load model artifacts")?;
    let metadata = store
        .load_metadata()
        .context("Failed to read training metadata")?;
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let state = AppState::new(
        Arc::new(scorer),
        metadata.as_ref(),
        &config.model_info,
        Some(metrics),
    )
    .with_validator(Validator::new(config.validation.clone()));
    let app = create_router(Arc::new(state), &config.cors);

    let addr = config.server.addr();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
