//! RSS feed handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use torrent_index_core::{render_rss, FeedChannel, SearchParams, SearchRequest, Viewer};

use super::error::ApiError;
use super::middleware::CurrentViewer;
use crate::metrics::FEEDS_RENDERED_TOTAL;
use crate::state::AppState;

/// Feed documents may be cached by readers for five minutes.
const FEED_CACHE_CONTROL: &str = "max-age=300";

/// GET /rss
pub async fn rss(
    State(state): State<Arc<AppState>>,
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    render_feed(&state, &viewer, SearchParams::from_pairs(query)).await
}

/// Run `params` as a feed listing and render it as RSS.
pub(crate) async fn render_feed(
    state: &AppState,
    viewer: &Viewer,
    params: SearchParams,
) -> Result<Response, ApiError> {
    let outcome = state
        .engine()
        .search(&SearchRequest::feed(params), viewer)
        .await?;

    let label = if outcome.spec.has_term() {
        format!("\"{}\"", outcome.spec.term())
    } else {
        "Home".to_string()
    };
    let site = state.site();
    let channel = FeedChannel::for_listing(&site.name, &site.url, &label);
    let xml = render_rss(&channel, &outcome.page.items)?;
    FEEDS_RENDERED_TOTAL.inc();

    Ok((
        [
            (header::CONTENT_TYPE, "application/xml"),
            (header::CACHE_CONTROL, FEED_CACHE_CONTROL),
        ],
        xml,
    )
        .into_response())
}
