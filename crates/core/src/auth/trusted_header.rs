//! Viewer resolution from a header set by a trusted fronting proxy.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{AuthError, AuthRequest, Authenticator};
use crate::viewer::{UserDirectory, Viewer};

/// Header carrying the proxy's shared secret.
pub const PROXY_SECRET_HEADER: &str = "x-proxy-secret";

/// Authenticator that trusts a username header injected by the session layer.
///
/// A missing username header resolves to the anonymous viewer. When a shared
/// secret is configured, requests carrying a username must also present the
/// secret in `X-Proxy-Secret`.
pub struct TrustedHeaderAuthenticator {
    header: String,
    shared_secret: Option<String>,
    users: Arc<dyn UserDirectory>,
}

impl TrustedHeaderAuthenticator {
    pub fn new(
        header: impl Into<String>,
        shared_secret: Option<String>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
            shared_secret,
            users,
        }
    }
}

#[async_trait]
impl Authenticator for TrustedHeaderAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Viewer, AuthError> {
        let Some(username) = request.header(&self.header) else {
            return Ok(Viewer::anonymous());
        };

        if let Some(expected) = &self.shared_secret {
            let provided = request.header(PROXY_SECRET_HEADER).unwrap_or_default();
            if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
                return Err(AuthError::InvalidCredentials(
                    "Invalid proxy secret".to_string(),
                ));
            }
        }

        let identity = self
            .users
            .by_username(username)
            .map_err(|e| AuthError::ServiceUnavailable(e.to_string()))?
            .ok_or_else(|| AuthError::InvalidCredentials(format!("Unknown user: {}", username)))?;

        debug!(username = %identity.username, level = ?identity.level, "Resolved viewer");
        Ok(Viewer::user(identity))
    }

    fn method_name(&self) -> &'static str {
        "trusted_header"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
