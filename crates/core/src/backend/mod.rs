//! Search execution backends.
//!
//! A [`SearchBackend`] turns a validated [`QuerySpec`] into one page of
//! results. The relational store serves browsing and is the fallback for
//! term searches; the external index serves term searches when enabled.

mod external;
mod relational;

pub use external::{ExternalIndexBackend, ExternalIndexSettings};
pub use relational::RelationalBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::query::QuerySpec;
use crate::record::Record;

/// Which backend produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Relational,
    ExternalIndex,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Relational => "relational",
            BackendKind::ExternalIndex => "external_index",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage {
    pub records: Vec<Record>,
    /// Total matching records, possibly a bounded estimate.
    pub total: u64,
    /// False when `total` is an estimate or was capped.
    pub total_is_exact: bool,
    pub page: u32,
    pub per_page: u32,
    pub backend: BackendKind,
}

/// How the relational backend counts totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Full `COUNT(*)` over the filtered set.
    Exact,
    /// Count a look-ahead window of `step` pages past the current one.
    Fast { step: u32 },
}

impl Default for PaginationMode {
    fn default() -> Self {
        PaginationMode::Fast { step: 5 }
    }
}

/// A search execution backend.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Execute `spec` and return the requested page.
    ///
    /// Failures never yield partial pages.
    async fn search(&self, spec: &QuerySpec) -> Result<ResultPage, SearchError>;
}
