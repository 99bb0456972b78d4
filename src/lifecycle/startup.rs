//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Hold a valid access token before any listener is bound
//! - Serve until shutdown, then report how the process ended
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::auth::{AuthError, OAuthClient, RenewalPolicy, TokenManager};
use crate::cache::{CacheError, MemorySiteCache, RedisSiteCache, SiteCache};
use crate::cms::CmsClient;
use crate::config::{CacheBackend, CacheConfig, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{self, ListenerError, TlsError, TlsListener};
use crate::observability::metrics;
use crate::routing::RoutingEngine;

/// Fatal conditions that stop the router from starting or keep it from
/// exiting cleanly.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid Redis URL: {0}")]
    RedisUrl(#[from] url::ParseError),

    #[error("Site cache unavailable: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to load site seed file: {0}")]
    Seed(std::io::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Initial token handshake failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("Token renewal failed past the retry limit")]
    RenewalExhausted,
}

async fn open_cache(config: &CacheConfig) -> Result<Arc<dyn SiteCache>, StartupError> {
    match config.backend {
        CacheBackend::Redis => {
            let url = config.redis_url()?;
            let cache = RedisSiteCache::connect(&url).await?;
            tracing::info!(host = %config.host, db = config.db, "Connected to Redis");
            Ok(Arc::new(cache))
        }
        CacheBackend::Memory => {
            let cache = match &config.seed_path {
                Some(path) => MemorySiteCache::load_from_file(Path::new(path)).map_err(StartupError::Seed)?,
                None => MemorySiteCache::new(),
            };
            tracing::warn!(sites = cache.len(), "Using in-memory site cache");
            Ok(Arc::new(cache))
        }
    }
}

async fn open_tls(config: &ProxyConfig) -> Result<Option<TlsListener>, StartupError> {
    let Some(tls) = &config.tls else {
        return Ok(None);
    };

    let addr = net::parse_addr(&tls.bind_address)?;
    let rustls = net::load_tls_config(
        Path::new(&tls.cert_path),
        Path::new(&tls.key_path),
        Path::new(&tls.ca_path),
    )
    .await?;

    Ok(Some(TlsListener { addr, config: rustls }))
}

/// Run the router until shutdown.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.tls.is_some(),
        backend = %config.backend.target,
        cache = ?config.cache.backend,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    let cache = open_cache(&config.cache).await?;

    let token_url = config.oauth.token_url(&config.cms.api_endpoint);
    let oauth = OAuthClient::new(
        token_url.clone(),
        config.oauth.client_id.clone(),
        config.oauth.client_secret.clone(),
        Duration::from_secs(config.timeouts.token_secs),
    )?;
    let tokens = TokenManager::bootstrap(
        Arc::new(oauth),
        RenewalPolicy::from(&config.oauth),
        shutdown.clone(),
    )
    .await?;
    tracing::info!(token_url = %token_url, expires_in = tokens.current_token().expires_in, "Access token obtained");

    let resolver = CmsClient::new(reqwest::Client::builder().build()?, config.cms.api_endpoint.clone());
    let engine = RoutingEngine::new(
        cache,
        Arc::new(resolver),
        tokens.clone(),
        config.backend.target.clone(),
        Duration::from_secs(config.timeouts.resolve_secs),
    )
    .with_single_flight(config.routing.single_flight)
    .with_cache_timeout(Duration::from_millis(config.timeouts.cache_ms));

    let tls = open_tls(&config).await?;
    let listener = net::bind(&config.listener.bind_address).await?;

    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(Arc::new(engine), &config);
    server.run(listener, tls, &shutdown).await?;

    if tokens.renewal_exhausted() {
        return Err(StartupError::RenewalExhausted);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
