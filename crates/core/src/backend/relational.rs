//! Relational execution over the SQLite store.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::error::SearchError;
use crate::query::{search_tokens, CategoryScope, QuerySpec, SortKey, SortOrder};
use crate::record::Record;
use crate::store::{SqliteStore, RECORD_COLUMNS};

use super::{BackendKind, PaginationMode, ResultPage, SearchBackend};

/// Executes queries against the relational store.
pub struct RelationalBackend {
    store: Arc<SqliteStore>,
    pagination: PaginationMode,
}

/// A filtered selection, ready to be counted or paged.
struct Selection {
    from: &'static str,
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl Selection {
    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

const BROWSE_FROM: &str = "torrents t LEFT JOIN statistics s ON s.torrent_id = t.id";
const FTS_FROM: &str = "torrents_fts f JOIN torrents t ON t.id = f.rowid \
     LEFT JOIN statistics s ON s.torrent_id = t.id";

impl RelationalBackend {
    pub fn new(store: Arc<SqliteStore>, pagination: PaginationMode) -> Self {
        Self { store, pagination }
    }

    fn select(spec: &QuerySpec) -> Selection {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        let from = match match_expression(spec.term()) {
            Some(expr) => {
                conditions.push("torrents_fts MATCH ?".to_string());
                params.push(Value::Text(expr));
                FTS_FROM
            }
            None => BROWSE_FROM,
        };

        if let Some(owner) = spec.owner_id() {
            conditions.push("t.uploader_id = ?".to_string());
            params.push(Value::Integer(owner));
        }

        match spec.category() {
            CategoryScope::All => {}
            CategoryScope::Main { main_id } => {
                conditions.push("t.main_category_id = ?".to_string());
                params.push(Value::Integer(main_id.into()));
            }
            CategoryScope::Sub { main_id, sub_id } => {
                conditions.push("t.main_category_id = ?".to_string());
                params.push(Value::Integer(main_id.into()));
                conditions.push("t.sub_category_id = ?".to_string());
                params.push(Value::Integer(sub_id.into()));
            }
        }

        let visibility = spec.visibility();
        if !visibility.forbidden.is_empty() {
            conditions.push("(t.flags & ?) = 0".to_string());
            params.push(Value::Integer(visibility.forbidden.bits().into()));
        }
        if let Some((flag, expected)) = visibility.quality {
            let test = if expected { "!=" } else { "=" };
            conditions.push(format!("(t.flags & ?) {} 0", test));
            params.push(Value::Integer(flag.bits().into()));
        }

        Selection {
            from,
            conditions,
            params,
        }
    }

    fn fetch(
        conn: &Connection,
        selection: &Selection,
        spec: &QuerySpec,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Record>, SearchError> {
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
            RECORD_COLUMNS,
            selection.from,
            selection.where_clause(),
            order_by(spec.sort(), spec.order()),
        );

        let mut params = selection.params.clone();
        params.push(Value::Integer(to_sql_int(limit)));
        params.push(Value::Integer(to_sql_int(offset)));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), SqliteStore::row_to_record)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count_all(conn: &Connection, selection: &Selection) -> Result<u64, SearchError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            selection.from,
            selection.where_clause()
        );
        let count: i64 =
            conn.query_row(&sql, params_from_iter(selection.params.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Count at most `limit` rows starting at `offset`.
    fn count_window(
        conn: &Connection,
        selection: &Selection,
        limit: u64,
        offset: u64,
    ) -> Result<u64, SearchError> {
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT 1 FROM {}{} LIMIT ? OFFSET ?)",
            selection.from,
            selection.where_clause()
        );
        let mut params = selection.params.clone();
        params.push(Value::Integer(to_sql_int(limit)));
        params.push(Value::Integer(to_sql_int(offset)));

        let count: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn execute(&self, spec: &QuerySpec) -> Result<ResultPage, SearchError> {
        let selection = Self::select(spec);
        let per_page = u64::from(spec.per_page());
        let conn = self.store.conn()?;

        if spec.is_feed() {
            let records = Self::fetch(&conn, &selection, spec, per_page, 0)?;
            let total = records.len() as u64;
            return Ok(ResultPage {
                total_is_exact: total < per_page,
                total,
                records,
                page: 1,
                per_page: spec.per_page(),
                backend: BackendKind::Relational,
            });
        }

        let offset = spec.offset();
        let records = Self::fetch(&conn, &selection, spec, per_page, offset)?;
        if records.is_empty() && spec.page() > 1 {
            return Err(SearchError::NotFound(format!("page {}", spec.page())));
        }

        let (total, total_is_exact) = match self.pagination {
            PaginationMode::Exact => (Self::count_all(&conn, &selection)?, true),
            PaginationMode::Fast { step } => {
                let window = u64::from(step.max(1)) * per_page;
                let seen = Self::count_window(&conn, &selection, window + 1, offset)?;
                fast_total(offset, window, seen)
            }
        };

        Ok(ResultPage {
            records,
            total,
            total_is_exact,
            page: spec.page(),
            per_page: spec.per_page(),
            backend: BackendKind::Relational,
        })
    }
}

#[async_trait]
impl SearchBackend for RelationalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn search(&self, spec: &QuerySpec) -> Result<ResultPage, SearchError> {
        let page = self.execute(spec)?;
        debug!(
            backend = "relational",
            term = spec.term(),
            page = page.page,
            results = page.records.len(),
            total = page.total,
            exact = page.total_is_exact,
            "Relational search complete"
        );
        Ok(page)
    }
}

/// Total for a look-ahead window of `window` rows that saw `seen` rows
/// (counted up to `window + 1`) from `offset`.
fn fast_total(offset: u64, window: u64, seen: u64) -> (u64, bool) {
    if seen <= window {
        (offset + seen, true)
    } else {
        (offset + window + 1, false)
    }
}

/// FTS5 query for a term: every token as a phrase, ANDed.
///
/// `None` when no token survives, which browses the unfiltered set.
fn match_expression(term: &str) -> Option<String> {
    let phrases: Vec<String> = search_tokens(term)
        .into_iter()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();

    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(" AND "))
    }
}

fn order_by(sort: SortKey, order: SortOrder) -> String {
    let column = match sort {
        SortKey::Id => "t.id",
        SortKey::Size => "t.filesize",
        SortKey::Name => "t.display_name",
        SortKey::Seeders => "COALESCE(s.seed_count, 0)",
        SortKey::Leechers => "COALESCE(s.leech_count, 0)",
        SortKey::Downloads => "COALESCE(s.download_count, 0)",
    };
    let dir = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    if sort == SortKey::Id {
        format!("{} {}", column, dir)
    } else {
        format!("{} {}, t.id {}", column, dir, dir)
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
