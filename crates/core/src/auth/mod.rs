mod none;
mod traits;
mod trusted_header;
mod types;

pub use none::*;
pub use traits::*;
pub use trusted_header::*;
pub use types::*;

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::viewer::UserDirectory;

/// Factory function to create authenticator from config
pub fn create_authenticator(
    config: &AuthConfig,
    users: Arc<dyn UserDirectory>,
) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::TrustedHeader => {
            let header = config.header.clone().ok_or_else(|| {
                AuthError::ConfigurationError(
                    "header must be set when using trusted_header auth method".to_string(),
                )
            })?;
            Ok(Box::new(TrustedHeaderAuthenticator::new(
                header,
                config.shared_secret.clone(),
                users,
            )))
        }
    }
}
