//! External full-text index (Elasticsearch-compatible) execution.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::query::{CategoryScope, QuerySpec, SortKey};
use crate::record::{Record, Statistics, TorrentFlags};

use super::{BackendKind, ResultPage, SearchBackend};

/// Connection settings for the external index.
#[derive(Debug, Clone)]
pub struct ExternalIndexSettings {
    /// Base URL, e.g. `http://localhost:9200`.
    pub url: String,
    /// Index name queried under the base URL.
    pub index: String,
    /// Deepest result the index can address.
    pub result_cap: u32,
    pub timeout_secs: u64,
}

/// Executes term searches against the external index.
pub struct ExternalIndexBackend {
    client: Client,
    settings: ExternalIndexSettings,
}

impl ExternalIndexBackend {
    pub fn new(settings: ExternalIndexSettings) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SearchError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    pub fn result_cap(&self) -> u32 {
        self.settings.result_cap
    }

    fn search_url(&self) -> String {
        format!(
            "{}/{}/_search",
            self.settings.url.trim_end_matches('/'),
            self.settings.index
        )
    }
}

#[async_trait]
impl SearchBackend for ExternalIndexBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ExternalIndex
    }

    async fn search(&self, spec: &QuerySpec) -> Result<ResultPage, SearchError> {
        let start = Instant::now();
        let spec = match spec.result_cap() {
            Some(_) => spec.clone(),
            None => spec.clone().for_external_index(self.settings.result_cap),
        };
        let cap = spec.result_cap().unwrap_or(self.settings.result_cap);
        let body = build_request_body(&spec, cap);

        let response = self
            .client
            .post(self.search_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                };
                warn!(url = %self.settings.url, error = %reason, "External index request failed");
                SearchError::BackendUnavailable(reason)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "External index returned an error status");
            return Err(SearchError::BackendUnavailable(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            SearchError::BackendUnavailable(format!("Failed to parse response: {}", e))
        })?;
        let page = into_result_page(parsed, &spec, cap)?;

        debug!(
            backend = "external_index",
            term = spec.term(),
            page = page.page,
            results = page.records.len(),
            total = page.total,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "External index search complete"
        );

        Ok(page)
    }
}

/// Index field a sort key maps to.
fn sort_field(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Id => "id",
        SortKey::Size => "filesize",
        SortKey::Name => "display_name.raw",
        SortKey::Seeders => "seed_count",
        SortKey::Leechers => "leech_count",
        SortKey::Downloads => "download_count",
    }
}

/// Search request body for `spec`, addressing at most `cap` results.
pub(crate) fn build_request_body(spec: &QuerySpec, cap: u32) -> Value {
    let mut filters = Vec::new();

    if let Some(owner) = spec.owner_id() {
        filters.push(json!({ "term": { "uploader_id": owner } }));
    }
    match spec.category() {
        CategoryScope::All => {}
        CategoryScope::Main { main_id } => {
            filters.push(json!({ "term": { "main_category_id": main_id } }));
        }
        CategoryScope::Sub { main_id, sub_id } => {
            filters.push(json!({ "term": { "main_category_id": main_id } }));
            filters.push(json!({ "term": { "sub_category_id": sub_id } }));
        }
    }

    let visibility = spec.visibility();
    for flag in visibility.forbidden_flags() {
        if let Some(field) = flag.index_field() {
            filters.push(json!({ "term": { field: false } }));
        }
    }
    if let Some((flag, expected)) = visibility.quality {
        if let Some(field) = flag.index_field() {
            filters.push(json!({ "term": { field: expected } }));
        }
    }

    // Same token set as the relational store: every token a phrase, all required.
    let mut must: Vec<Value> = spec
        .search_tokens()
        .into_iter()
        .map(|token| json!({ "match_phrase": { "display_name": token } }))
        .collect();
    if must.is_empty() {
        must.push(json!({ "match_all": {} }));
    }

    let order = spec.order().as_str();
    let mut sort = vec![json!({ sort_field(spec.sort()): { "order": order } })];
    if spec.sort() != SortKey::Id {
        sort.push(json!({ "id": { "order": order } }));
    }

    let from = if spec.is_feed() { 0 } else { spec.offset() };
    let size = u64::from(spec.per_page()).min(u64::from(cap).saturating_sub(from));

    json!({
        "query": { "bool": { "must": must, "filter": filters } },
        "sort": sort,
        "from": from,
        "size": size,
        "track_total_hits": cap,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: HitsTotal,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Older servers report a bare number, newer ones a `{value, relation}` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HitsTotal {
    Count(u64),
    Object {
        value: u64,
        #[serde(default = "default_relation")]
        relation: String,
    },
}

fn default_relation() -> String {
    "eq".to_string()
}

impl HitsTotal {
    fn value_and_exact(&self) -> (u64, bool) {
        match self {
            HitsTotal::Count(n) => (*n, true),
            HitsTotal::Object { value, relation } => (*value, relation == "eq"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: IndexDocument,
}

/// Document shape stored in the index.
#[derive(Debug, Deserialize)]
struct IndexDocument {
    id: i64,
    #[serde(default)]
    info_hash: String,
    display_name: String,
    #[serde(default)]
    uploader_id: Option<i64>,
    #[serde(default)]
    filesize: u64,
    created_time: DateTime<Utc>,
    main_category_id: u32,
    sub_category_id: u32,
    #[serde(default)]
    anonymous: bool,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    trusted: bool,
    #[serde(default)]
    remake: bool,
    #[serde(default)]
    complete: bool,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    seed_count: u32,
    #[serde(default)]
    leech_count: u32,
    #[serde(default)]
    download_count: u32,
}

impl From<IndexDocument> for Record {
    fn from(doc: IndexDocument) -> Self {
        let mut flags = TorrentFlags::empty();
        flags.set(TorrentFlags::ANONYMOUS, doc.anonymous);
        flags.set(TorrentFlags::HIDDEN, doc.hidden);
        flags.set(TorrentFlags::TRUSTED, doc.trusted);
        flags.set(TorrentFlags::REMAKE, doc.remake);
        flags.set(TorrentFlags::COMPLETE, doc.complete);
        flags.set(TorrentFlags::DELETED, doc.deleted);

        Record {
            id: doc.id,
            info_hash: doc.info_hash,
            display_name: doc.display_name,
            uploader: doc.uploader_id,
            filesize: doc.filesize,
            created_at: doc.created_time,
            main_category_id: doc.main_category_id,
            sub_category_id: doc.sub_category_id,
            flags,
            stats: Statistics {
                seed_count: doc.seed_count,
                leech_count: doc.leech_count,
                download_count: doc.download_count,
            },
        }
    }
}

/// Page for `spec` from an index response.
///
/// An empty page past the first is `NotFound`, as in the relational store.
pub(crate) fn into_result_page(
    response: SearchResponse,
    spec: &QuerySpec,
    cap: u32,
) -> Result<ResultPage, SearchError> {
    let (reported, relation_exact) = response.hits.total.value_and_exact();
    let cap = u64::from(cap);
    let records: Vec<Record> = response
        .hits
        .hits
        .into_iter()
        .map(|hit| Record::from(hit.source))
        .collect();

    if records.is_empty() && spec.page() > 1 && !spec.is_feed() {
        return Err(SearchError::NotFound(format!("page {}", spec.page())));
    }

    Ok(ResultPage {
        records,
        total: reported.min(cap),
        total_is_exact: relation_exact && reported <= cap,
        page: spec.page(),
        per_page: spec.per_page(),
        backend: BackendKind::ExternalIndex,
    })
}
