use std::sync::Arc;
use torrent_index_core::config::SiteConfig;
use torrent_index_core::{Authenticator, Config, SanitizedConfig, SearchEngine, SiteTorrentLinks};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    engine: Arc<SearchEngine>,
    links: SiteTorrentLinks,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        engine: Arc<SearchEngine>,
    ) -> Self {
        let links = SiteTorrentLinks::new(config.site.url.clone(), config.site.trackers.clone());
        Self {
            config,
            authenticator,
            engine,
            links,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn engine(&self) -> &SearchEngine {
        self.engine.as_ref()
    }

    pub fn site(&self) -> &SiteConfig {
        &self.config.site
    }

    pub fn links(&self) -> &SiteTorrentLinks {
        &self.links
    }
}
