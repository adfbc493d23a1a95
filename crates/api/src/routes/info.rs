//! Service Information Routes

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Root response
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Type and accuracy of one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescription {
    #[serde(rename = "type")]
    pub model_type: String,
    pub accuracy: String,
}

/// Per-model descriptions keyed by short model name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptions {
    pub gbt: ModelDescription,
    pub oblivious: ModelDescription,
}

/// `/model-info` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub models: ModelDescriptions,
    pub ensemble_method: String,
    pub features_expected: usize,
    pub last_updated: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Fraud Detection ML Service is running".to_string(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfoResponse> {
    Json(state.model_info.clone())
}
