//! Prediction Route

use axum::{extract::State, Json};
use feature_engine::TransactionRecord;
use inference_engine::EnsemblePrediction;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::AppState;

/// Validate, encode and score one transaction
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(record): Json<TransactionRecord>,
) -> Result<Json<EnsemblePrediction>, ApiError> {
    let start = Instant::now();

    let validation = state.validator.validate_record(&record);
    if !validation.valid {
        counter!("fraud_prediction_errors_total", "kind" => "validation").increment(1);
        return Err(ApiError::Validation(validation.errors));
    }

    let result = state.scorer.score(&record).map_err(|e| {
        error!("Prediction failed: {}", e);
        counter!("fraud_prediction_errors_total", "kind" => "inference").increment(1);
        ApiError::Inference(e)
    })?;

    let elapsed = start.elapsed();
    counter!("fraud_predictions_total").increment(1);
    histogram!("fraud_prediction_latency_seconds").record(elapsed.as_secs_f64());
    if result.is_fraud {
        counter!("fraud_flagged_total").increment(1);
    }
    debug!(
        "Scored transaction at {} in {:?}: {:.4} ({})",
        record.merchant, elapsed, result.prediction, result.risk_level
    );

    Ok(Json(result))
}
