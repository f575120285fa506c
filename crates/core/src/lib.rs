pub mod auth;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod presenter;
pub mod query;
pub mod record;
pub mod store;
pub mod taxonomy;
pub mod testing;
pub mod viewer;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, NoneAuthenticator,
    TrustedHeaderAuthenticator,
};
pub use backend::{
    BackendKind, ExternalIndexBackend, ExternalIndexSettings, PaginationMode, RelationalBackend,
    ResultPage, SearchBackend,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use engine::{DegradePolicy, QueryEcho, SearchEngine, SearchOutcome};
pub use error::SearchError;
pub use feed::{render_rss, FeedChannel, FeedError};
pub use presenter::{
    FeedItem, PresentedPage, RenderKind, ResultPresenter, SiteTorrentLinks, TorrentLinks,
};
pub use query::{
    ListingSurface, QuerySpec, QuerySpecBuilder, SearchParams, SearchRequest, SortKey, SortOrder,
};
pub use record::{Record, RecordSource, Statistics, TorrentFlags, UserId};
pub use store::SqliteStore;
pub use taxonomy::{CategoryTaxonomy, Taxonomy, TaxonomySource};
pub use viewer::{UserDirectory, UserIdentity, UserLevel, Viewer};
