//! Mock search backend for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::backend::{BackendKind, ResultPage, SearchBackend};
use crate::error::SearchError;
use crate::query::{search_tokens, QuerySpec, SortOrder};
use crate::record::Record;

/// Mock implementation of the SearchBackend trait.
///
/// Evaluates queries in memory over a configured record set:
/// - owner, category and visibility filters are applied
/// - every term token must appear in the display name (case-insensitive)
/// - results are ordered by id
///
/// Received specs are recorded for assertions and failures can be injected.
///
/// # Example
///
/// ```rust,ignore
/// use torrent_index_core::testing::MockSearchBackend;
///
/// let backend = MockSearchBackend::new(BackendKind::ExternalIndex);
/// backend.set_records(vec![/* records */]).await;
/// backend.set_next_error(SearchError::BackendUnavailable("down".into())).await;
///
/// // Use in a SearchEngine...
/// let specs = backend.recorded_specs().await;
/// ```
pub struct MockSearchBackend {
    kind: BackendKind,
    records: Arc<RwLock<Vec<Record>>>,
    specs: Arc<RwLock<Vec<QuerySpec>>>,
    next_error: Arc<RwLock<Option<SearchError>>>,
}

impl std::fmt::Debug for MockSearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSearchBackend")
            .field("kind", &self.kind)
            .field("records", &"<records>")
            .finish()
    }
}

impl MockSearchBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            records: Arc::new(RwLock::new(Vec::new())),
            specs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a mock backend with predefined records.
    pub fn with_records(kind: BackendKind, records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            ..Self::new(kind)
        }
    }

    pub async fn set_records(&self, records: Vec<Record>) {
        *self.records.write().await = records;
    }

    /// Specs received so far, oldest first.
    pub async fn recorded_specs(&self) -> Vec<QuerySpec> {
        self.specs.read().await.clone()
    }

    pub async fn search_count(&self) -> usize {
        self.specs.read().await.len()
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    fn matches(spec: &QuerySpec, record: &Record, tokens: &[String]) -> bool {
        if let Some(owner) = spec.owner_id() {
            if record.uploader != Some(owner) {
                return false;
            }
        }
        if !spec
            .category()
            .matches(record.main_category_id, record.sub_category_id)
        {
            return false;
        }
        if !spec.visibility().matches(record) {
            return false;
        }
        let name = record.display_name.to_lowercase();
        tokens.iter().all(|t| name.contains(&t.to_lowercase()))
    }
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn search(&self, spec: &QuerySpec) -> Result<ResultPage, SearchError> {
        self.specs.write().await.push(spec.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let tokens = search_tokens(spec.term());
        let mut matched: Vec<Record> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| Self::matches(spec, r, &tokens))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.id);
        if spec.order() == SortOrder::Desc {
            matched.reverse();
        }

        let total = match spec.result_cap() {
            Some(cap) => (matched.len() as u64).min(u64::from(cap)),
            None => matched.len() as u64,
        };
        let offset = if spec.is_feed() { 0 } else { spec.offset() };
        let records = matched
            .into_iter()
            .skip(offset as usize)
            .take(spec.per_page() as usize)
            .collect();

        Ok(ResultPage {
            records,
            total,
            total_is_exact: true,
            page: spec.page(),
            per_page: spec.per_page(),
            backend: self.kind,
        })
    }
}
