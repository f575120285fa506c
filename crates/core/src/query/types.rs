//! Normalized query specification.

use serde::{Deserialize, Serialize};

use crate::record::{TorrentFlags, UserId};
use crate::viewer::{UserIdentity, Viewer};

use super::terms::search_tokens;
use super::visibility::VisibilityFilter;

/// Column a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Id,
    Size,
    Name,
    Seeders,
    Leechers,
    Downloads,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "id" => Some(SortKey::Id),
            "size" => Some(SortKey::Size),
            "name" => Some(SortKey::Name),
            "seeders" => Some(SortKey::Seeders),
            "leechers" => Some(SortKey::Leechers),
            "downloads" => Some(SortKey::Downloads),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Size => "size",
            SortKey::Name => "name",
            SortKey::Seeders => "seeders",
            SortKey::Leechers => "leechers",
            SortKey::Downloads => "downloads",
        }
    }

    /// Whether the key lives on the statistics aggregate rather than the record.
    pub fn uses_statistics(self) -> bool {
        matches!(
            self,
            SortKey::Seeders | SortKey::Leechers | SortKey::Downloads
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Taxonomy restriction of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum CategoryScope {
    #[default]
    All,
    Main { main_id: u32 },
    Sub { main_id: u32, sub_id: u32 },
}

impl CategoryScope {
    /// Category parameter form, `"<main>_<sub>"`.
    pub fn as_param(self) -> String {
        match self {
            CategoryScope::All => "0_0".to_string(),
            CategoryScope::Main { main_id } => format!("{}_0", main_id),
            CategoryScope::Sub { main_id, sub_id } => format!("{}_{}", main_id, sub_id),
        }
    }

    pub fn matches(self, main_category_id: u32, sub_category_id: u32) -> bool {
        match self {
            CategoryScope::All => true,
            CategoryScope::Main { main_id } => main_category_id == main_id,
            CategoryScope::Sub { main_id, sub_id } => {
                main_category_id == main_id && sub_category_id == sub_id
            }
        }
    }
}

/// Single flag predicate narrowing results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFilter {
    #[default]
    None,
    NoRemakes,
    TrustedOnly,
    CompleteOnly,
}

impl QualityFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "0" => Some(QualityFilter::None),
            "1" => Some(QualityFilter::NoRemakes),
            "2" => Some(QualityFilter::TrustedOnly),
            "3" => Some(QualityFilter::CompleteOnly),
            _ => None,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            QualityFilter::None => "0",
            QualityFilter::NoRemakes => "1",
            QualityFilter::TrustedOnly => "2",
            QualityFilter::CompleteOnly => "3",
        }
    }

    /// The `(flag, expected state)` pair this filter requires.
    pub fn predicate(self) -> Option<(TorrentFlags, bool)> {
        match self {
            QualityFilter::None => None,
            QualityFilter::NoRemakes => Some((TorrentFlags::REMAKE, false)),
            QualityFilter::TrustedOnly => Some((TorrentFlags::TRUSTED, true)),
            QualityFilter::CompleteOnly => Some((TorrentFlags::COMPLETE, true)),
        }
    }
}

/// A validated query, built once per request by
/// [`QuerySpecBuilder`](super::QuerySpecBuilder).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    pub(crate) term: String,
    pub(crate) sort: SortKey,
    pub(crate) order: SortOrder,
    pub(crate) category: CategoryScope,
    pub(crate) quality: QualityFilter,
    pub(crate) owner: Option<UserIdentity>,
    pub(crate) viewer: Viewer,
    pub(crate) privileged_override: bool,
    pub(crate) page: u32,
    pub(crate) per_page: u32,
    pub(crate) feed: bool,
    pub(crate) result_cap: Option<u32>,
}

impl QuerySpec {
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn has_term(&self) -> bool {
        !self.term.is_empty()
    }

    /// Tokens the backends match on, see [`search_tokens`].
    pub fn search_tokens(&self) -> Vec<String> {
        search_tokens(&self.term)
    }

    /// Whether the term narrows the listing at all.
    ///
    /// A term made only of short or punctuation tokens is a browse.
    pub fn is_term_search(&self) -> bool {
        !self.search_tokens().is_empty()
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn category(&self) -> CategoryScope {
        self.category
    }

    pub fn quality(&self) -> QualityFilter {
        self.quality
    }

    pub fn owner(&self) -> Option<&UserIdentity> {
        self.owner.as_ref()
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.owner.as_ref().map(|o| o.id)
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn privileged_override(&self) -> bool {
        self.privileged_override
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn is_feed(&self) -> bool {
        self.feed
    }

    pub fn result_cap(&self) -> Option<u32> {
        self.result_cap
    }

    /// Row offset of the first record on the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn visibility(&self) -> VisibilityFilter {
        VisibilityFilter::for_spec(self)
    }

    /// Same query with an empty term, for browsing through the relational store.
    pub(crate) fn without_term(mut self) -> Self {
        self.term.clear();
        self.result_cap = None;
        self
    }

    /// Adapt the query to the external index's addressable window.
    ///
    /// Pages beyond `ceil(cap / per_page)` are moved to the last addressable
    /// page. Feeds cap the window at one feed's worth of results.
    pub(crate) fn for_external_index(mut self, result_cap: u32) -> Self {
        if self.feed {
            self.result_cap = Some(self.per_page);
            self.page = 1;
            return self;
        }
        let cap = result_cap.max(1);
        let max_page = cap.div_ceil(self.per_page.max(1)).max(1);
        self.page = self.page.min(max_page);
        self.result_cap = Some(cap);
        self
    }
}

#[cfg(test)]
impl QuerySpec {
    /// Anonymous browse of the first page, for tests to adjust.
    pub(crate) fn fixture() -> Self {
        QuerySpec {
            term: String::new(),
            sort: SortKey::Id,
            order: SortOrder::Desc,
            category: CategoryScope::All,
            quality: QualityFilter::None,
            owner: None,
            viewer: Viewer::anonymous(),
            privileged_override: false,
            page: 1,
            per_page: 75,
            feed: false,
            result_cap: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(page: u32, per_page: u32, feed: bool) -> QuerySpec {
        QuerySpec {
            term: "foo".to_string(),
            page,
            per_page,
            feed,
            ..QuerySpec::fixture()
        }
    }

    #[test]
    fn test_sort_key_parse_is_case_insensitive() {
        assert_eq!(SortKey::parse("SeedErs"), Some(SortKey::Seeders));
        assert_eq!(SortKey::parse("size"), Some(SortKey::Size));
        assert_eq!(SortKey::parse("date"), None);
        assert!(SortKey::Downloads.uses_statistics());
        assert!(!SortKey::Name.uses_statistics());
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("ASC"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse("desc"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("up"), None);
    }

    #[test]
    fn test_quality_filter_predicates() {
        assert_eq!(QualityFilter::parse("0"), Some(QualityFilter::None));
        assert_eq!(QualityFilter::parse("4"), None);
        assert_eq!(QualityFilter::None.predicate(), None);
        assert_eq!(
            QualityFilter::NoRemakes.predicate(),
            Some((TorrentFlags::REMAKE, false))
        );
        assert_eq!(
            QualityFilter::TrustedOnly.predicate(),
            Some((TorrentFlags::TRUSTED, true))
        );
        assert_eq!(
            QualityFilter::CompleteOnly.predicate(),
            Some((TorrentFlags::COMPLETE, true))
        );
    }

    #[test]
    fn test_category_scope_matches() {
        assert!(CategoryScope::All.matches(3, 4));
        assert!(CategoryScope::Main { main_id: 3 }.matches(3, 4));
        assert!(!CategoryScope::Main { main_id: 3 }.matches(2, 4));
        assert!(CategoryScope::Sub { main_id: 3, sub_id: 4 }.matches(3, 4));
        assert!(!CategoryScope::Sub { main_id: 3, sub_id: 4 }.matches(3, 5));
        assert_eq!(CategoryScope::Sub { main_id: 3, sub_id: 4 }.as_param(), "3_4");
    }

    #[test]
    fn test_external_page_clamp() {
        let clamped = spec(100, 75, false).for_external_index(1000);
        assert_eq!(clamped.page(), 14);
        assert_eq!(clamped.result_cap(), Some(1000));

        let untouched = spec(3, 75, false).for_external_index(1000);
        assert_eq!(untouched.page(), 3);
    }

    #[test]
    fn test_external_feed_caps_to_feed_size() {
        let feed = spec(1, 75, true).for_external_index(1000);
        assert_eq!(feed.page(), 1);
        assert_eq!(feed.result_cap(), Some(75));
    }

    #[test]
    fn test_offset() {
        assert_eq!(spec(1, 75, false).offset(), 0);
        assert_eq!(spec(3, 75, false).offset(), 150);
    }
}
