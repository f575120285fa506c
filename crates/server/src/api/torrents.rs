//! Single record handler.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::error::ApiError;
use super::listing::TorrentSummary;
use super::middleware::CurrentViewer;
use crate::state::AppState;

/// GET /api/v1/torrents/{id}
///
/// Deleted records are only shown to privileged viewers.
pub async fn get_torrent(
    State(state): State<Arc<AppState>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(id): Path<i64>,
) -> Result<Json<TorrentSummary>, ApiError> {
    let record = state.engine().view(id, &viewer)?;
    Ok(Json(TorrentSummary::new(&state, record, &viewer)?))
}
