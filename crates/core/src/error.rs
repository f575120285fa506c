use thiserror::Error;

/// Errors surfaced by listing and search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed sort, order, category or filter syntax.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Category, user or record reference does not resolve.
    #[error("Not found: {0}")]
    NotFound(String),

    /// External index failed or timed out.
    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Viewer lacks privilege for an admin-scoped listing.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SearchError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::InvalidParameter(_) => "invalid_parameter",
            SearchError::NotFound(_) => "not_found",
            SearchError::BackendUnavailable(_) => "backend_unavailable",
            SearchError::Forbidden(_) => "forbidden",
            SearchError::Internal(_) => "internal",
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(e: rusqlite::Error) -> Self {
        SearchError::Internal(format!("Database error: {}", e))
    }
}
