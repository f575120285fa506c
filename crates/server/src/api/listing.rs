//! Listing and search handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use torrent_index_core::presenter::format_filesize;
use torrent_index_core::{
    BackendKind, QueryEcho, Record, SearchOutcome, SearchParams, SearchRequest, Statistics,
    TorrentFlags, TorrentLinks, UserId, Viewer,
};

use super::error::ApiError;
use super::feed;
use super::middleware::CurrentViewer;
use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TorrentSummary {
    pub id: i64,
    pub display_name: String,
    pub info_hash: String,
    /// Omitted for anonymous uploads unless the viewer may see who uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_id: Option<UserId>,
    pub filesize: u64,
    pub size: String,
    pub created_at: DateTime<Utc>,
    pub category: String,
    pub category_label: String,
    pub trusted: bool,
    pub remake: bool,
    pub complete: bool,
    /// Moderation flags, only present for privileged viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<TorrentFlags>,
    pub stats: Statistics,
    pub view_url: String,
    pub torrent_url: String,
    pub magnet: String,
}

impl TorrentSummary {
    pub fn new(state: &AppState, record: Record, viewer: &Viewer) -> Result<Self, ApiError> {
        let links = state.links();
        let reveal_uploader = !record.has(TorrentFlags::ANONYMOUS)
            || viewer.is_privileged()
            || record.uploader.is_some_and(|u| viewer.is(u));

        Ok(Self {
            category_label: state
                .engine()
                .category_label(record.main_category_id, record.sub_category_id)?,
            category: record.category_key(),
            size: format_filesize(record.filesize),
            trusted: record.has(TorrentFlags::TRUSTED),
            remake: record.has(TorrentFlags::REMAKE),
            complete: record.has(TorrentFlags::COMPLETE),
            flags: viewer.is_privileged().then_some(record.flags),
            uploader_id: record.uploader.filter(|_| reveal_uploader),
            view_url: links.view_url(&record),
            torrent_url: links.torrent_file(&record),
            magnet: links.magnet(&record),
            id: record.id,
            display_name: record.display_name,
            info_hash: record.info_hash,
            filesize: record.filesize,
            created_at: record.created_at,
            stats: record.stats,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub torrents: Vec<TorrentSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_is_exact: bool,
    pub total_pages: u64,
    pub range_start: u64,
    pub range_end: u64,
    /// "Displaying results X-Y out of Z results."
    pub summary: String,
    pub backend: BackendKind,
    pub query: QueryEcho,
    /// Feed reproducing this listing.
    pub rss_url: String,
}

impl ListingResponse {
    fn new(state: &AppState, outcome: SearchOutcome, viewer: &Viewer) -> Result<Self, ApiError> {
        let SearchOutcome { page, echo, .. } = outcome;
        let summary = page.summary();
        let rss_url = if echo.is_empty() {
            format!("{}/rss", state.links().site_url())
        } else {
            format!("{}/rss?{}", state.links().site_url(), echo.to_query_string())
        };

        let torrents = page
            .records
            .into_iter()
            .map(|record| TorrentSummary::new(state, record, viewer))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            torrents,
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_is_exact: page.total_is_exact,
            total_pages: page.total_pages,
            range_start: page.range_start,
            range_end: page.range_end,
            summary,
            backend: page.backend,
            query: echo,
            rss_url,
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/torrents
///
/// Browse or search the catalog. `page=rss` renders the feed instead.
pub async fn home(
    State(state): State<Arc<AppState>>,
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let params = SearchParams::from_pairs(query);
    if params.requests_feed() {
        return feed::render_feed(&state, &viewer, params).await;
    }

    let outcome = state
        .engine()
        .search(&SearchRequest::home(params), &viewer)
        .await?;
    Ok(Json(ListingResponse::new(&state, outcome, &viewer)?).into_response())
}

/// GET /api/v1/users/{username}/torrents
///
/// One uploader's listing. Anonymous uploads only appear on the uploader's
/// own listing or to privileged viewers.
pub async fn user_listing(
    State(state): State<Arc<AppState>>,
    CurrentViewer(viewer): CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ListingResponse>, ApiError> {
    let request = SearchRequest::user(username, SearchParams::from_pairs(query));
    let outcome = state.engine().search(&request, &viewer).await?;
    Ok(Json(ListingResponse::new(&state, outcome, &viewer)?))
}
