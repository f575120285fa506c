use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{feed, handlers, listing, torrents};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Catalog
        .route("/categories", get(handlers::list_categories))
        .route("/torrents", get(listing::home))
        .route("/torrents/{id}", get(torrents::get_torrent))
        .route("/users/{username}/torrents", get(listing::user_listing));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/rss", get(feed::rss))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
