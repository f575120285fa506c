//! The listing and search engine shared by every surface.
//!
//! One call validates the request, picks a backend, executes the query and
//! shapes the result page. Home, user pages, admin views and feeds all go
//! through [`SearchEngine::search`].

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{BackendKind, SearchBackend};
use crate::error::SearchError;
use crate::metrics;
use crate::presenter::{PresentedPage, ResultPresenter};
use crate::query::{CategoryScope, QualityFilter, QuerySpec, QuerySpecBuilder, SearchRequest};
use crate::record::{Record, RecordSource, TorrentFlags};
use crate::taxonomy::CategoryTaxonomy;
use crate::viewer::{UserDirectory, Viewer};

/// Query parameters that reproduce a listing, for feed links.
///
/// Only the term, category, quality filter and owner are carried, each only
/// when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryEcho {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub u: Option<String>,
}

impl QueryEcho {
    pub fn from_spec(spec: &QuerySpec) -> Self {
        Self {
            q: spec.has_term().then(|| spec.term().to_string()),
            c: (spec.category() != CategoryScope::All).then(|| spec.category().as_param()),
            f: (spec.quality() != QualityFilter::None).then(|| spec.quality().as_param().to_string()),
            u: spec.owner().map(|o| o.username.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_none() && self.c.is_none() && self.f.is_none() && self.u.is_none()
    }

    /// URL-encoded `q=..&c=..` form, empty when nothing is set.
    pub fn to_query_string(&self) -> String {
        [("q", &self.q), ("c", &self.c), ("f", &self.f), ("u", &self.u)]
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .map(|v| format!("{}={}", key, urlencoding::encode(v)))
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Result of one listing request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub page: PresentedPage,
    pub spec: QuerySpec,
    pub echo: QueryEcho,
}

/// Routes term searches away from a failing external index for a while.
///
/// The failing request itself still fails; only later requests are rerouted.
#[derive(Debug, Default)]
pub struct DegradePolicy {
    cooldown: Option<Duration>,
    until: RwLock<Option<Instant>>,
}

impl DegradePolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown: Some(cooldown),
            until: RwLock::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cooldown.is_some()
    }

    /// Whether term searches currently skip the external index.
    pub fn is_degraded(&self) -> bool {
        let until = match self.until.read() {
            Ok(until) => *until,
            Err(_) => return false,
        };
        match until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                if let Ok(mut until) = self.until.write() {
                    if until.is_some_and(|d| Instant::now() >= d) {
                        *until = None;
                        metrics::EXTERNAL_INDEX_DEGRADED.set(0);
                        info!("External index cooldown elapsed, resuming term searches there");
                    }
                }
                false
            }
            None => false,
        }
    }

    /// Start a cooldown after a failure. Returns whether one was started.
    pub fn record_failure(&self) -> bool {
        let Some(cooldown) = self.cooldown else {
            return false;
        };
        match self.until.write() {
            Ok(mut until) => {
                *until = Some(Instant::now() + cooldown);
                metrics::EXTERNAL_INDEX_DEGRADED.set(1);
                warn!(
                    cooldown_secs = cooldown.as_secs(),
                    "External index unavailable, routing term searches to the relational store"
                );
                true
            }
            Err(_) => false,
        }
    }
}

struct ExternalRoute {
    backend: Arc<dyn SearchBackend>,
    result_cap: u32,
}

/// Listing and search engine.
pub struct SearchEngine {
    taxonomy: Arc<CategoryTaxonomy>,
    users: Arc<dyn UserDirectory>,
    records: Arc<dyn RecordSource>,
    relational: Arc<dyn SearchBackend>,
    external: Option<ExternalRoute>,
    presenter: ResultPresenter,
    degrade: DegradePolicy,
    per_page: u32,
}

impl SearchEngine {
    pub fn new(
        taxonomy: Arc<CategoryTaxonomy>,
        users: Arc<dyn UserDirectory>,
        records: Arc<dyn RecordSource>,
        relational: Arc<dyn SearchBackend>,
        presenter: ResultPresenter,
        per_page: u32,
    ) -> Self {
        Self {
            taxonomy,
            users,
            records,
            relational,
            external: None,
            presenter,
            degrade: DegradePolicy::disabled(),
            per_page: per_page.max(1),
        }
    }

    /// Serve term searches from `backend`, addressing at most `result_cap` results.
    pub fn with_external_index(mut self, backend: Arc<dyn SearchBackend>, result_cap: u32) -> Self {
        self.external = Some(ExternalRoute {
            backend,
            result_cap: result_cap.max(1),
        });
        self
    }

    pub fn with_degrade_policy(mut self, degrade: DegradePolicy) -> Self {
        self.degrade = degrade;
        self
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn external_index_enabled(&self) -> bool {
        self.external.is_some()
    }

    pub fn is_degraded(&self) -> bool {
        self.degrade.is_degraded()
    }

    /// Validate `request` for `viewer`, run it on one backend, and shape the page.
    pub async fn search(
        &self,
        request: &SearchRequest,
        viewer: &Viewer,
    ) -> Result<SearchOutcome, SearchError> {
        let spec = QuerySpecBuilder::new(&self.taxonomy, self.users.as_ref(), self.per_page)
            .build(request, viewer)
            .inspect_err(|e| {
                metrics::QUERY_REJECTIONS.with_label_values(&[e.kind()]).inc();
                debug!(error = %e, "Listing request rejected");
            })?;

        let (backend, spec) = self.route(spec);
        let kind = backend.kind();
        let start = Instant::now();
        let result = backend.search(&spec).await;
        let elapsed = start.elapsed();

        metrics::SEARCH_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(elapsed.as_secs_f64());

        let page = match result {
            Ok(page) => {
                metrics::SEARCHES_TOTAL
                    .with_label_values(&[kind.as_str(), "ok"])
                    .inc();
                metrics::SEARCH_RESULTS
                    .with_label_values(&[kind.as_str()])
                    .observe(page.records.len() as f64);
                page
            }
            Err(e) => {
                metrics::SEARCHES_TOTAL
                    .with_label_values(&[kind.as_str(), e.kind()])
                    .inc();
                if kind == BackendKind::ExternalIndex
                    && matches!(e, SearchError::BackendUnavailable(_))
                {
                    metrics::EXTERNAL_INDEX_FAILURES.inc();
                    warn!(error = %e, term = spec.term(), "External index search failed");
                    self.degrade.record_failure();
                }
                return Err(e);
            }
        };

        debug!(
            backend = %kind,
            term = spec.term(),
            page = spec.page(),
            feed = spec.is_feed(),
            results = page.records.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Listing served"
        );

        let presented = if spec.is_feed() {
            self.presenter
                .present_feed(page, request.params.use_magnet_links())?
        } else {
            self.presenter.present_page(page)
        };
        let echo = QueryEcho::from_spec(&spec);

        Ok(SearchOutcome {
            page: presented,
            spec,
            echo,
        })
    }

    /// Pick the backend for `spec`, adapting the spec to it.
    fn route(&self, spec: QuerySpec) -> (&dyn SearchBackend, QuerySpec) {
        match &self.external {
            Some(route) if spec.is_term_search() => {
                if self.degrade.is_degraded() {
                    info!(mode = "degraded", term = spec.term(), "Serving term search from relational store");
                    (self.relational.as_ref(), spec)
                } else {
                    (route.backend.as_ref(), spec.for_external_index(route.result_cap))
                }
            }
            _ => (self.relational.as_ref(), spec),
        }
    }

    /// A single record, as the record page shows it.
    ///
    /// Deleted records are only shown to privileged viewers. Hidden records
    /// stay reachable by direct link.
    pub fn view(&self, id: i64, viewer: &Viewer) -> Result<Record, SearchError> {
        let record = self
            .records
            .record_by_id(id)?
            .ok_or_else(|| SearchError::NotFound(format!("torrent {}", id)))?;

        if record.has(TorrentFlags::DELETED) && !viewer.is_privileged() {
            return Err(SearchError::NotFound(format!("torrent {}", id)));
        }
        Ok(record)
    }

    /// Category key to label list map, for category pickers.
    pub fn categories(&self) -> Result<BTreeMap<String, Vec<String>>, SearchError> {
        Ok(self.taxonomy.get()?.id_map())
    }

    /// `"Main - Sub"` label for a category pair.
    pub fn category_label(&self, main_id: u32, sub_id: u32) -> Result<String, SearchError> {
        Ok(self.taxonomy.get()?.label(main_id, sub_id))
    }
}
