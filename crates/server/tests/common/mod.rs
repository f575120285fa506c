//! Common test utilities for E2E testing.
//!
//! This module provides a test fixture that creates an in-process server
//! over a seeded in-memory store, with an optional mock external index,
//! enabling E2E testing without external infrastructure.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use torrent_index_core::testing::{fixtures, MockSearchBackend};
use torrent_index_core::{
    load_config_from_str, BackendKind, CategoryTaxonomy, Config, DegradePolicy, PaginationMode,
    RelationalBackend, ResultPresenter, SearchEngine, SiteTorrentLinks, SqliteStore,
    TorrentFlags, TrustedHeaderAuthenticator, UserLevel,
};

/// Header the fixture's authenticator reads the username from.
pub const USER_HEADER: &str = "X-User";

pub const SITE_URL: &str = "https://index.example";

/// Test fixture for E2E testing.
///
/// The store is seeded with:
/// - users `alice` (1, regular), `bob` (2, regular), `mod` (3, moderator)
/// - records 1..=6, see [`seed_records`]
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_home_listing() {
///     let fixture = TestFixture::new();
///     let response = fixture.get("/api/v1/torrents").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Seeded relational store
    pub store: Arc<SqliteStore>,
    /// Mock external index (if enabled)
    pub external: Option<Arc<MockSearchBackend>>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture using only the relational store.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let config = test_config.config();
        let store = Arc::new(SqliteStore::in_memory().expect("Failed to create store"));
        seed(&store);

        let taxonomy = Arc::new(CategoryTaxonomy::new(store.clone()));
        let presenter = ResultPresenter::new(
            Arc::clone(&taxonomy),
            Arc::new(SiteTorrentLinks::new(SITE_URL, config.site.trackers.clone())),
        );
        let relational = Arc::new(RelationalBackend::new(
            Arc::clone(&store),
            PaginationMode::Exact,
        ));

        let mut engine = SearchEngine::new(
            taxonomy,
            store.clone(),
            store.clone(),
            relational,
            presenter,
            test_config.per_page,
        );

        let external = test_config.external_index.then(|| {
            Arc::new(MockSearchBackend::with_records(
                BackendKind::ExternalIndex,
                seed_records(),
            ))
        });
        if let Some(backend) = &external {
            engine = engine
                .with_external_index(backend.clone(), test_config.result_cap)
                .with_degrade_policy(DegradePolicy::with_cooldown(
                    std::time::Duration::from_secs(60),
                ));
        }

        let authenticator = Arc::new(TrustedHeaderAuthenticator::new(
            USER_HEADER,
            None,
            store.clone(),
        ));

        let state = Arc::new(torrent_index_server::state::AppState::new(
            config,
            authenticator,
            Arc::new(engine),
        ));
        let router = torrent_index_server::api::create_router(state);

        Self {
            router,
            store,
            external,
        }
    }

    /// Send an anonymous GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(path, None).await
    }

    /// Send a GET request as `username`.
    pub async fn get_as(&self, path: &str, username: &str) -> TestResponse {
        self.request(path, Some(username)).await
    }

    async fn request(&self, path: &str, username: Option<&str>) -> TestResponse {
        let mut request_builder = Request::builder().method("GET").uri(path);
        if let Some(username) = username {
            request_builder = request_builder.header(USER_HEADER, username);
        }
        let request = request_builder.body(Body::empty()).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            text,
            body,
        }
    }

    /// Ids of the torrents in a listing response, in order.
    pub fn ids(response: &TestResponse) -> Vec<i64> {
        response.body["torrents"]
            .as_array()
            .map(|torrents| {
                torrents
                    .iter()
                    .filter_map(|t| t["id"].as_i64())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Route term searches to a mock external index
    pub external_index: bool,
    pub result_cap: u32,
    pub per_page: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            external_index: false,
            result_cap: 1000,
            per_page: 75,
        }
    }
}

impl TestConfig {
    /// Create config with the mock external index enabled.
    pub fn with_external_index() -> Self {
        Self {
            external_index: true,
            ..Default::default()
        }
    }

    fn config(&self) -> Config {
        load_config_from_str(&format!(
            r#"
[auth]
method = "trusted_header"
header = "{}"

[search]
results_per_page = {}

[site]
name = "Test Index"
url = "{}"
trackers = ["udp://tracker.example:1337/announce"]
"#,
            USER_HEADER, self.per_page, SITE_URL
        ))
        .expect("Invalid test config")
    }
}

/// The seeded catalog:
/// 1. "[Group] Naruto - 01" by alice, trusted
/// 2. "[Group] Naruto - 02" by alice, anonymous
/// 3. "[Other] Bleach - 01" by bob
/// 4. "[Group] Naruto - 03" by bob, hidden
/// 5. "[Group] Naruto - 04" by alice, deleted
/// 6. "Lossless Album" by bob, remake, category 2_1
pub fn seed_records() -> Vec<torrent_index_core::Record> {
    let mut album = fixtures::owned_record(6, "Lossless Album", 2, TorrentFlags::REMAKE);
    album.main_category_id = 2;
    album.sub_category_id = 1;

    vec![
        fixtures::owned_record(1, "[Group] Naruto - 01", 1, TorrentFlags::TRUSTED),
        fixtures::owned_record(2, "[Group] Naruto - 02", 1, TorrentFlags::ANONYMOUS),
        fixtures::owned_record(3, "[Other] Bleach - 01", 2, TorrentFlags::empty()),
        fixtures::owned_record(4, "[Group] Naruto - 03", 2, TorrentFlags::HIDDEN),
        fixtures::owned_record(5, "[Group] Naruto - 04", 1, TorrentFlags::DELETED),
        album,
    ]
}

fn seed(store: &SqliteStore) {
    for main in fixtures::taxonomy().mains() {
        store.insert_category(main).expect("Failed to seed category");
    }
    for user in [
        fixtures::user(1, "alice", UserLevel::Regular),
        fixtures::user(2, "bob", UserLevel::Regular),
        fixtures::user(3, "mod", UserLevel::Moderator),
    ] {
        store.insert_user(&user).expect("Failed to seed user");
    }
    for record in seed_records() {
        store.insert_record(&record).expect("Failed to seed record");
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
