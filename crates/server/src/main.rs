use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use torrent_index_core::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use torrent_index_core::{
    create_authenticator, load_config, validate_config, Authenticator, CategoryTaxonomy,
    DegradePolicy, ExternalIndexBackend, RelationalBackend, ResultPresenter, SearchEngine,
    SiteTorrentLinks, SqliteStore,
};

use torrent_index_server::api::create_router;
use torrent_index_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Relational store (records, users, categories)
    let store = Arc::new(
        SqliteStore::new(&config.database.path).context("Failed to open torrent store")?,
    );
    info!("Torrent store initialized");

    let taxonomy = Arc::new(CategoryTaxonomy::new(store.clone()));
    let links = Arc::new(SiteTorrentLinks::new(
        config.site.url.clone(),
        config.site.trackers.clone(),
    ));
    let presenter = ResultPresenter::new(Arc::clone(&taxonomy), links);

    let pagination = config.search.pagination_mode();
    info!("Relational pagination: {:?}", pagination);
    let relational = Arc::new(RelationalBackend::new(Arc::clone(&store), pagination));

    let mut engine = SearchEngine::new(
        taxonomy,
        store.clone(),
        store.clone(),
        relational,
        presenter,
        config.search.results_per_page,
    );

    // Create external index backend if enabled
    let external = &config.external_index;
    if external.enabled {
        info!("Initializing external index at {} (index: {})", external.url, external.index);
        let backend = ExternalIndexBackend::new(external.settings())
            .context("Failed to create external index client")?;
        engine = engine.with_external_index(Arc::new(backend), external.result_cap);

        if let Some(cooldown) = external.degrade_cooldown() {
            info!("External index degrade cooldown: {:?}", cooldown);
            engine = engine.with_degrade_policy(DegradePolicy::with_cooldown(cooldown));
        }
    } else {
        info!("External index disabled, all searches use the relational store");
    }

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth, store.clone())
            .context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        Arc::new(engine),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
