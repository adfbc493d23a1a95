//! Prometheus Exposition

use axum::extract::State;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Render every recorded metric in Prometheus text format
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| ApiError::Unavailable("Metrics recorder not installed".to_string()))
}
