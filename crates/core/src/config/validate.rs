use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Page size, count step and result cap are positive
/// - External index URL is set when the index is enabled
/// - Trusted-header auth names its header
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Search validation
    if config.search.results_per_page == 0 {
        return Err(ConfigError::ValidationError(
            "search.results_per_page cannot be 0".to_string(),
        ));
    }
    if config.search.fast_count_step == 0 {
        return Err(ConfigError::ValidationError(
            "search.fast_count_step cannot be 0".to_string(),
        ));
    }

    // External index validation
    let external = &config.external_index;
    if external.result_cap == 0 {
        return Err(ConfigError::ValidationError(
            "external_index.result_cap cannot be 0".to_string(),
        ));
    }
    if external.enabled && external.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "external_index.url must be set when the external index is enabled".to_string(),
        ));
    }

    // Auth validation
    if config.auth.method == AuthMethod::TrustedHeader
        && config.auth.header.as_deref().is_none_or(|h| h.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.header must be set when using trusted_header auth".to_string(),
        ));
    }

    Ok(())
}
