use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::{ExternalIndexSettings, PaginationMode};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub external_index: ExternalIndexConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Username header set by the fronting proxy (required for `trusted_header`)
    #[serde(default)]
    pub header: Option<String>,
    /// Secret the proxy presents in `X-Proxy-Secret`
    #[serde(default)]
    pub shared_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    TrustedHeader,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::TrustedHeader => "trusted_header",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("torrent-index.db")
}

/// How listing totals are counted.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaginationKind {
    Exact,
    #[default]
    Fast,
}

/// Listing and search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_results_per_page")]
    pub results_per_page: u32,
    #[serde(default)]
    pub pagination: PaginationKind,
    /// Pages counted past the current one in `fast` mode
    #[serde(default = "default_fast_count_step")]
    pub fast_count_step: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            results_per_page: default_results_per_page(),
            pagination: PaginationKind::default(),
            fast_count_step: default_fast_count_step(),
        }
    }
}

impl SearchConfig {
    pub fn pagination_mode(&self) -> PaginationMode {
        match self.pagination {
            PaginationKind::Exact => PaginationMode::Exact,
            PaginationKind::Fast => PaginationMode::Fast {
                step: self.fast_count_step,
            },
        }
    }
}

fn default_results_per_page() -> u32 {
    75
}

fn default_fast_count_step() -> u32 {
    5
}

/// External full-text index configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExternalIndexConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Index server URL (e.g., "http://localhost:9200")
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_index_name")]
    pub index: String,
    /// Deepest result the index will return
    #[serde(default = "default_result_cap")]
    pub result_cap: u32,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Route term searches to the relational store for this long after a failure
    #[serde(default)]
    pub degrade_cooldown_secs: Option<u64>,
}

impl Default for ExternalIndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            index: default_index_name(),
            result_cap: default_result_cap(),
            timeout_secs: default_timeout(),
            degrade_cooldown_secs: None,
        }
    }
}

impl ExternalIndexConfig {
    pub fn settings(&self) -> ExternalIndexSettings {
        ExternalIndexSettings {
            url: self.url.clone(),
            index: self.index.clone(),
            result_cap: self.result_cap,
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn degrade_cooldown(&self) -> Option<Duration> {
        self.degrade_cooldown_secs.map(Duration::from_secs)
    }
}

fn default_index_name() -> String {
    "torrents".to_string()
}

fn default_result_cap() -> u32 {
    1000
}

fn default_timeout() -> u64 {
    10
}

/// Public site identity used for links and feeds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_site_url")]
    pub url: String,
    /// Announce URLs added to magnet links
    #[serde(default)]
    pub trackers: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            url: default_site_url(),
            trackers: Vec::new(),
        }
    }
}

fn default_site_name() -> String {
    "Torrent Index".to_string()
}

fn default_site_url() -> String {
    "http://localhost:8080".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub external_index: ExternalIndexConfig,
    pub site: SiteConfig,
}

/// Sanitized auth config (shared secret hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub shared_secret_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
                header: config.auth.header.clone(),
                shared_secret_configured: config
                    .auth
                    .shared_secret
                    .as_ref()
                    .is_some_and(|s| !s.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            search: config.search.clone(),
            external_index: config.external_index.clone(),
            site: config.site.clone(),
        }
    }
}
