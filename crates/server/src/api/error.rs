//! Mapping of core errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use torrent_index_core::{FeedError, SearchError};
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    Search(SearchError),
    Feed(FeedError),
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        ApiError::Search(e)
    }
}

impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        ApiError::Feed(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Search(SearchError::InvalidParameter(_)) => StatusCode::BAD_REQUEST,
            ApiError::Search(SearchError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Search(SearchError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Search(SearchError::BackendUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Search(SearchError::Internal(_)) | ApiError::Feed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Search(e) => e.to_string(),
            ApiError::Feed(e) => e.to_string(),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %message, "Request failed");
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
