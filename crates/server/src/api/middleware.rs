//! Viewer resolution and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use torrent_index_core::{AuthError, AuthRequest, Viewer};
use tracing::warn;

use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Resolves the viewer with the configured authenticator.
///
/// The resolved `Viewer` is stored in request extensions. Requests without
/// credentials continue as anonymous; bad credentials are rejected with 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();

    // Extract headers into HashMap for AuthRequest
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    // Get source IP (default to localhost if not available)
    let source_ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match authenticator.authenticate(&auth_request).await {
        Ok(viewer) => {
            request.extensions_mut().insert(viewer);
            Ok(next.run(request).await)
        }
        Err(AuthError::InvalidCredentials(reason)) => {
            warn!(%reason, "Rejected request credentials");
            AUTH_FAILURES_TOTAL
                .with_label_values(&["invalid_credentials"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            warn!(error = %e, "Viewer resolution failed");
            AUTH_FAILURES_TOTAL.with_label_values(&["internal_error"]).inc();
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Extractor for the resolved viewer.
///
/// Falls back to the anonymous viewer if no viewer is present (shouldn't
/// happen if auth middleware is properly configured).
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Viewer);

impl<S> FromRequestParts<S> for CurrentViewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let viewer = parts
            .extensions
            .get::<Viewer>()
            .cloned()
            .unwrap_or_else(Viewer::anonymous);
        std::future::ready(Ok(CurrentViewer(viewer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::Request,
        middleware,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use torrent_index_core::testing::{fixtures, MockSearchBackend, MockUserDirectory};
    use torrent_index_core::{
        load_config_from_str, BackendKind, CategoryTaxonomy, NoneAuthenticator, RecordSource,
        ResultPresenter, SearchEngine, SearchError, SiteTorrentLinks, TrustedHeaderAuthenticator,
        UserDirectory, UserLevel,
    };
    use tower::ServiceExt;

    struct NoRecords;

    impl RecordSource for NoRecords {
        fn record_by_id(&self, _id: i64) -> Result<Option<torrent_index_core::Record>, SearchError> {
            Ok(None)
        }
    }

    fn users() -> Arc<dyn UserDirectory> {
        Arc::new(MockUserDirectory::with_users(vec![
            fixtures::user(1, "alice", UserLevel::Regular),
            fixtures::user(2, "mod", UserLevel::Moderator),
        ]))
    }

    fn create_test_state(authenticator: Arc<dyn torrent_index_core::Authenticator>) -> Arc<AppState> {
        let config = load_config_from_str("[auth]\nmethod = \"none\"\n").unwrap();
        let taxonomy = Arc::new(CategoryTaxonomy::preloaded(fixtures::taxonomy()));
        let presenter = ResultPresenter::new(
            Arc::clone(&taxonomy),
            Arc::new(SiteTorrentLinks::new("http://localhost", Vec::new())),
        );
        let engine = SearchEngine::new(
            taxonomy,
            users(),
            Arc::new(NoRecords),
            Arc::new(MockSearchBackend::new(BackendKind::Relational)),
            presenter,
            75,
        );
        Arc::new(AppState::new(config, authenticator, Arc::new(engine)))
    }

    async fn viewer_handler(CurrentViewer(viewer): CurrentViewer) -> String {
        viewer
            .identity
            .map(|i| i.username)
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/test", get(viewer_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn body_text(response: Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_none_auth_is_anonymous() {
        let state = create_test_state(Arc::new(NoneAuthenticator::new()));

        let request = Request::builder()
            .uri("/test")
            .header("X-User", "mod")
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_trusted_header_resolves_viewer() {
        let state = create_test_state(Arc::new(TrustedHeaderAuthenticator::new(
            "X-User",
            None,
            users(),
        )));

        let request = Request::builder()
            .uri("/test")
            .header("X-User", "alice")
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "alice");
    }

    #[tokio::test]
    async fn test_trusted_header_missing_is_anonymous() {
        let state = create_test_state(Arc::new(TrustedHeaderAuthenticator::new(
            "X-User",
            None,
            users(),
        )));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_trusted_header_unknown_user_rejected() {
        let state = create_test_state(Arc::new(TrustedHeaderAuthenticator::new(
            "X-User",
            None,
            users(),
        )));

        let request = Request::builder()
            .uri("/test")
            .header("X-User", "mallory")
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_trusted_header_wrong_secret_rejected() {
        let state = create_test_state(Arc::new(TrustedHeaderAuthenticator::new(
            "X-User",
            Some("s3cret".to_string()),
            users(),
        )));

        let request = Request::builder()
            .uri("/test")
            .header("X-User", "alice")
            .header("X-Proxy-Secret", "nope")
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
