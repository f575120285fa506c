use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use torrent_index_core::SanitizedConfig;

use super::error::ApiError;
use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// "disabled", "ok" or "degraded"
    pub external_index: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine = state.engine();
    let external_index = if !engine.external_index_enabled() {
        "disabled"
    } else if engine.is_degraded() {
        "degraded"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        external_index: external_index.to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /api/v1/categories
///
/// Category key to label list, e.g. `"1_2": ["Anime", "English-translated"]`.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Vec<String>>>, ApiError> {
    Ok(Json(state.engine().categories()?))
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
