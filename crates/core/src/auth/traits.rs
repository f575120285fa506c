use async_trait::async_trait;
use thiserror::Error;

use super::types::AuthRequest;
use crate::viewer::Viewer;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Authentication service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve who is making the request. Requests without credentials
    /// resolve to the anonymous viewer.
    async fn authenticate(&self, request: &AuthRequest) -> Result<Viewer, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}
