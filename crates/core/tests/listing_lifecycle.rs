//! Listing integration tests over a file-backed store.
//!
//! These tests drive the search engine against a real SQLite catalog:
//! - Fast and exact pagination totals
//! - Term search through the full-text projection
//! - Statistics sorting with deterministic tie-breaks
//! - Reopening a persisted catalog

use std::sync::Arc;

use tempfile::TempDir;

use torrent_index_core::testing::fixtures;
use torrent_index_core::{
    CategoryTaxonomy, PaginationMode, Record, RelationalBackend, ResultPresenter, SearchEngine,
    SearchError, SearchParams, SearchRequest, SiteTorrentLinks, SqliteStore, Statistics,
    TorrentFlags, UserLevel, Viewer,
};

const PER_PAGE: u32 = 5;

/// Forty records; every tenth one is deleted, leaving 36 visible.
fn catalog() -> Vec<Record> {
    (1..=40)
        .map(|id| {
            let quality = if id % 2 == 0 { "1080p" } else { "720p" };
            let flags = if id % 10 == 0 {
                TorrentFlags::DELETED
            } else {
                TorrentFlags::empty()
            };
            let mut record =
                fixtures::owned_record(id, &format!("[Group] Show {:02} [{}]", id, quality), 1, flags);
            record.stats = Statistics {
                seed_count: (id % 7) as u32,
                leech_count: 0,
                download_count: id as u32,
            };
            record
        })
        .collect()
}

/// Test helper owning the catalog directory and the engine over it.
struct TestHarness {
    engine: SearchEngine,
    _dir: TempDir,
}

impl TestHarness {
    fn new(pagination: PaginationMode) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteStore::new(&dir.path().join("catalog.db")).expect("Failed to create store"),
        );
        for main in fixtures::taxonomy().mains() {
            store.insert_category(main).unwrap();
        }
        store
            .insert_user(&fixtures::user(1, "uploader", UserLevel::Trusted))
            .unwrap();
        for record in catalog() {
            store.insert_record(&record).unwrap();
        }

        Self {
            engine: engine(store, pagination),
            _dir: dir,
        }
    }

    async fn list(&self, pairs: &[(&str, &str)]) -> Result<torrent_index_core::SearchOutcome, SearchError> {
        let params = SearchParams::from_pairs(pairs.iter().copied());
        self.engine
            .search(&SearchRequest::home(params), &Viewer::anonymous())
            .await
    }
}

fn engine(store: Arc<SqliteStore>, pagination: PaginationMode) -> SearchEngine {
    let taxonomy = Arc::new(CategoryTaxonomy::new(store.clone()));
    let presenter = ResultPresenter::new(
        Arc::clone(&taxonomy),
        Arc::new(SiteTorrentLinks::new("https://index.example", Vec::new())),
    );
    SearchEngine::new(
        taxonomy,
        store.clone(),
        store.clone(),
        Arc::new(RelationalBackend::new(Arc::clone(&store), pagination)),
        presenter,
        PER_PAGE,
    )
}

fn ids(outcome: &torrent_index_core::SearchOutcome) -> Vec<i64> {
    outcome.page.records.iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn test_fast_count_reports_lookahead_on_first_page() {
    let harness = TestHarness::new(PaginationMode::Fast { step: 2 });

    let outcome = harness.list(&[]).await.unwrap();
    assert_eq!(ids(&outcome), vec![39, 38, 37, 36, 35]);
    assert_eq!(outcome.page.total, 11);
    assert!(!outcome.page.total_is_exact);
    assert_eq!(outcome.page.total_pages, 3);
    assert_eq!(
        outcome.page.summary(),
        "Displaying results 1-5 out of at least 11 results."
    );
}

#[tokio::test]
async fn test_fast_count_is_exact_near_the_end() {
    let harness = TestHarness::new(PaginationMode::Fast { step: 2 });

    let outcome = harness.list(&[("p", "7")]).await.unwrap();
    assert_eq!(outcome.page.total, 36);
    assert!(outcome.page.total_is_exact);
    assert_eq!(outcome.page.total_pages, 8);

    let last = harness.list(&[("p", "8")]).await.unwrap();
    assert_eq!(ids(&last), vec![1]);
    assert_eq!((last.page.range_start, last.page.range_end), (36, 36));

    let past_end = harness.list(&[("p", "9")]).await;
    assert!(matches!(past_end, Err(SearchError::NotFound(_))));
}

#[tokio::test]
async fn test_fast_count_never_reports_missing_pages() {
    let harness = TestHarness::new(PaginationMode::Fast { step: 2 });

    for page in 1..=8u32 {
        let p = page.to_string();
        let outcome = harness.list(&[("p", p.as_str())]).await.unwrap();
        let reported_last = outcome.page.total_pages.to_string();
        let last = harness
            .list(&[("p", reported_last.as_str())])
            .await
            .unwrap();
        assert!(!last.page.records.is_empty(), "page {} reported {}", page, reported_last);
    }
}

#[tokio::test]
async fn test_exact_count() {
    let harness = TestHarness::new(PaginationMode::Exact);

    let outcome = harness.list(&[]).await.unwrap();
    assert_eq!(outcome.page.total, 36);
    assert!(outcome.page.total_is_exact);
    assert_eq!(outcome.page.total_pages, 8);
}

#[tokio::test]
async fn test_term_search_only_narrows() {
    let harness = TestHarness::new(PaginationMode::Exact);

    let mut browse = Vec::new();
    let mut search = Vec::new();
    for page in 1..=8u32 {
        let p = page.to_string();
        browse.extend(ids(&harness.list(&[("p", p.as_str())]).await.unwrap()));
        if let Ok(outcome) = harness.list(&[("q", "1080p"), ("p", p.as_str())]).await {
            search.extend(ids(&outcome));
        }
    }

    assert_eq!(browse.len(), 36);
    assert_eq!(search.len(), 16);
    assert!(search.iter().all(|id| browse.contains(id)));
    assert!(search.iter().all(|id| id % 2 == 0 && id % 10 != 0));
}

#[tokio::test]
async fn test_short_tokens_behave_as_browse() {
    let harness = TestHarness::new(PaginationMode::Exact);

    let browse = harness.list(&[]).await.unwrap();
    let short = harness.list(&[("q", "a")]).await.unwrap();
    assert_eq!(ids(&short), ids(&browse));
    assert_eq!(short.page.total, browse.page.total);
}

#[tokio::test]
async fn test_statistics_sort_breaks_ties_by_id() {
    let harness = TestHarness::new(PaginationMode::Exact);

    let outcome = harness.list(&[("s", "seeders"), ("o", "asc")]).await.unwrap();
    assert_eq!(ids(&outcome), vec![7, 14, 21, 28, 35]);

    let downloads = harness.list(&[("s", "downloads")]).await.unwrap();
    assert_eq!(ids(&downloads), vec![39, 38, 37, 36, 35]);
}

#[tokio::test]
async fn test_persisted_catalog_reopens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.db");
    {
        let store = SqliteStore::new(&path).unwrap();
        for main in fixtures::taxonomy().mains() {
            store.insert_category(main).unwrap();
        }
        store
            .insert_record(&fixtures::record(1, "[Group] Persisted Show"))
            .unwrap();
    }

    let store = Arc::new(SqliteStore::new(&path).unwrap());
    let engine = engine(store, PaginationMode::Exact);
    let params = SearchParams::new().with("q", "persisted");
    let outcome = engine
        .search(&SearchRequest::home(params), &Viewer::anonymous())
        .await
        .unwrap();

    assert_eq!(ids(&outcome), vec![1]);
    assert_eq!(
        engine.categories().unwrap()["1_2"],
        vec!["Anime".to_string(), "English-translated".to_string()]
    );
}
