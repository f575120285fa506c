//! Raw parameters to a validated [`QuerySpec`].

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;

use crate::error::SearchError;
use crate::taxonomy::CategoryTaxonomy;
use crate::viewer::{UserDirectory, UserIdentity, Viewer};

use super::params::{parse_page, ListingSurface, SearchRequest};
use super::types::{CategoryScope, QualityFilter, QuerySpec, SortKey, SortOrder};

static CATEGORY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)_(\d+)$").unwrap());

/// Builds query specs against the taxonomy and user directory.
pub struct QuerySpecBuilder<'a> {
    taxonomy: &'a CategoryTaxonomy,
    users: &'a dyn UserDirectory,
    per_page: u32,
}

impl<'a> QuerySpecBuilder<'a> {
    pub fn new(taxonomy: &'a CategoryTaxonomy, users: &'a dyn UserDirectory, per_page: u32) -> Self {
        Self {
            taxonomy,
            users,
            per_page: per_page.max(1),
        }
    }

    /// Validate `request` for `viewer`.
    ///
    /// Syntax is checked before any lookup, so malformed requests fail
    /// without touching a collaborator.
    pub fn build(&self, request: &SearchRequest, viewer: &Viewer) -> Result<QuerySpec, SearchError> {
        let params = &request.params;

        let sort = match params.sort() {
            Some(raw) => SortKey::parse(raw)
                .ok_or_else(|| SearchError::InvalidParameter(format!("unknown sort key '{}'", raw)))?,
            None => SortKey::Id,
        };
        let order = match params.order() {
            Some(raw) => SortOrder::parse(raw)
                .ok_or_else(|| SearchError::InvalidParameter(format!("unknown order '{}'", raw)))?,
            None => SortOrder::Desc,
        };
        let quality = match params.quality() {
            Some(raw) => QualityFilter::parse(raw).ok_or_else(|| {
                SearchError::InvalidParameter(format!("unknown quality filter '{}'", raw))
            })?,
            None => QualityFilter::None,
        };
        let category = parse_category(params.category())?;

        let admin_requested = params.admin_requested();
        if admin_requested && !viewer.is_privileged() {
            return Err(SearchError::Forbidden(
                "admin visibility requires moderator privileges".to_string(),
            ));
        }

        self.resolve_category(category)?;
        let owner = self.resolve_owner(request)?;

        let term = params.term().map(str::trim).unwrap_or_default().to_string();
        let feed = request.is_feed();
        let (sort, order, page) = if feed {
            (SortKey::Id, SortOrder::Desc, 1)
        } else {
            (sort, order, parse_page(params.page()))
        };

        let spec = QuerySpec {
            term,
            sort,
            order,
            category,
            quality,
            owner,
            viewer: viewer.clone(),
            privileged_override: admin_requested && viewer.is_privileged(),
            page,
            per_page: self.per_page,
            feed,
            result_cap: None,
        };

        debug!(
            term = %spec.term,
            sort = spec.sort.as_str(),
            order = spec.order.as_str(),
            category = %spec.category.as_param(),
            page = spec.page,
            feed = spec.feed,
            "Query spec built"
        );

        Ok(spec)
    }

    fn resolve_category(&self, scope: CategoryScope) -> Result<(), SearchError> {
        match scope {
            CategoryScope::All => Ok(()),
            CategoryScope::Main { main_id } => self
                .taxonomy
                .main_label(main_id)?
                .map(|_| ())
                .ok_or_else(|| SearchError::NotFound(format!("category {}_0", main_id))),
            CategoryScope::Sub { main_id, sub_id } => self
                .taxonomy
                .sub_label(main_id, sub_id)?
                .map(|_| ())
                .ok_or_else(|| SearchError::NotFound(format!("category {}_{}", main_id, sub_id))),
        }
    }

    fn resolve_owner(&self, request: &SearchRequest) -> Result<Option<UserIdentity>, SearchError> {
        let username = match &request.surface {
            ListingSurface::User { username } => Some(username.as_str()),
            ListingSurface::Home | ListingSurface::Feed => {
                request.params.username().filter(|u| !u.is_empty())
            }
        };

        match username {
            Some(name) => self
                .users
                .by_username(name)?
                .map(Some)
                .ok_or_else(|| SearchError::NotFound(format!("user '{}'", name))),
            None => Ok(None),
        }
    }
}

/// Parse `"<main>_<sub>"`; absent means unrestricted.
pub fn parse_category(raw: Option<&str>) -> Result<CategoryScope, SearchError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(CategoryScope::All),
    };

    let invalid = || SearchError::InvalidParameter(format!("malformed category '{}'", raw));
    let captures = CATEGORY_PATTERN.captures(raw).ok_or_else(invalid)?;
    let main_id: u32 = captures[1].parse().map_err(|_| invalid())?;
    let sub_id: u32 = captures[2].parse().map_err(|_| invalid())?;

    Ok(match (main_id, sub_id) {
        (0, _) => CategoryScope::All,
        (main_id, 0) => CategoryScope::Main { main_id },
        (main_id, sub_id) => CategoryScope::Sub { main_id, sub_id },
    })
}
