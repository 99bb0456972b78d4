//! Per-request routing decision.
//!
//! # State Machine
//! ```text
//! Start ──classify──▶ Passthrough(backend + path)
//!   │
//!   ▼ lookup(host)
//! miss ─────────────▶ NotFound
//! hit + landing id ─▶ Redirect(/p/{id})
//! hit, no landing id
//!   │ resolve under deadline
//!   ├─ Some(id) ─ write-through ─▶ Redirect(/p/{id})
//!   ├─ None ─────────────────────▶ NotFound
//!   └─ error / deadline ─────────▶ ServerError
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use futures_util::future::FutureExt;
use thiserror::Error;
use tokio::time::timeout;

use crate::auth::TokenManager;
use crate::cache::{CacheError, SiteCache};
use crate::cms::{PageResolver, ResolveError};
use crate::observability::metrics;
use crate::routing::classifier::classify;
use crate::routing::inflight::{InflightResolutions, PendingResolution};

/// Default deadline for one site cache read or write.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a request could not be routed.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Landing page resolution exceeded {0:?}")]
    Timeout(Duration),

    #[error("Routing exceeded the request deadline of {0:?}")]
    RequestTimeout(Duration),
}

/// Outcome of routing one request.
#[derive(Debug)]
pub enum RoutingDecision {
    /// Forward to this absolute backend URL.
    Passthrough(String),
    /// Redirect to this path on the requesting host.
    Redirect(String),
    NotFound,
    ServerError(RouteError),
}

impl RoutingDecision {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            RoutingDecision::Passthrough(_) => "passthrough",
            RoutingDecision::Redirect(_) => "redirect",
            RoutingDecision::NotFound => "not_found",
            RoutingDecision::ServerError(_) => "server_error",
        }
    }
}

/// Path of a resolved page.
pub fn landing_path(page_id: &str) -> String {
    format!("/p/{}", page_id)
}

/// Decides what to do with each request.
///
/// Owns the process-wide collaborators: the site cache, the CMS resolver, and
/// the token manager.
pub struct RoutingEngine {
    cache: Arc<dyn SiteCache>,
    resolver: Arc<dyn PageResolver>,
    tokens: Arc<TokenManager>,
    backend_target: String,
    resolve_timeout: Duration,
    cache_timeout: Duration,
    inflight: Option<InflightResolutions>,
}

/// Unregisters a waiter's in-flight entry when it stops waiting, including
/// when the request itself is cancelled.
struct FinishOnDrop<'a> {
    inflight: &'a InflightResolutions,
    host: &'a str,
    id: u64,
}

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.inflight.finish(self.host, self.id);
    }
}

impl RoutingEngine {
    pub fn new(
        cache: Arc<dyn SiteCache>,
        resolver: Arc<dyn PageResolver>,
        tokens: Arc<TokenManager>,
        backend_target: impl Into<String>,
        resolve_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            resolver,
            tokens,
            backend_target: backend_target.into().trim_end_matches('/').to_string(),
            resolve_timeout,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            inflight: None,
        }
    }

    /// Bound every cache call; an elapsed call counts as an outage.
    pub fn with_cache_timeout(mut self, cache_timeout: Duration) -> Self {
        self.cache_timeout = cache_timeout;
        self
    }

    /// Share one CMS call between concurrent requests for the same host.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(InflightResolutions::new);
        self
    }

    /// Route a request for `host`.
    ///
    /// `path` is used for classification; `path_and_query` is what gets
    /// appended to the backend on passthrough.
    pub async fn route(&self, host: &str, path: &str, path_and_query: &str) -> RoutingDecision {
        if classify(path) {
            return RoutingDecision::Passthrough(format!("{}{}", self.backend_target, path_and_query));
        }

        match self.route_host(host).await {
            Ok(decision) => decision,
            Err(e) => RoutingDecision::ServerError(e),
        }
    }

    async fn cache_call<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        match timeout(self.cache_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Unavailable(format!("no reply within {:?}", self.cache_timeout))),
        }
    }

    async fn route_host(&self, host: &str) -> Result<RoutingDecision, RouteError> {
        let Some(mapping) = self.cache_call(self.cache.lookup(host)).await? else {
            tracing::debug!(host = %host, "Unknown host");
            return Ok(RoutingDecision::NotFound);
        };

        if let Some(page_id) = mapping.landing_page_id {
            return Ok(RoutingDecision::Redirect(landing_path(&page_id)));
        }

        match self.resolve(host, &mapping.site_id).await? {
            Some(page_id) => {
                self.cache_call(self.cache.set_landing_page(host, &page_id)).await?;
                tracing::info!(host = %host, site_id = %mapping.site_id, landing_page_id = %page_id, "Resolved landing page");
                Ok(RoutingDecision::Redirect(landing_path(&page_id)))
            }
            None => {
                tracing::warn!(host = %host, site_id = %mapping.site_id, "Site has no landing page");
                Ok(RoutingDecision::NotFound)
            }
        }
    }

    async fn resolve(&self, host: &str, site_id: &str) -> Result<Option<String>, RouteError> {
        let start = Instant::now();
        let token = self.tokens.current_token();

        let result = match &self.inflight {
            Some(inflight) => {
                let resolver = self.resolver.clone();
                let site_id = site_id.to_string();
                let bearer = token.access_token.clone();
                let PendingResolution { id, leader, future } = inflight.join_or_start(host, move || {
                    async move { resolver.resolve(&site_id, &bearer).await }.boxed()
                });
                if !leader {
                    tracing::debug!(host = %host, "Joining in-flight resolution");
                }

                let _finish = FinishOnDrop { inflight, host, id };
                timeout(self.resolve_timeout, future).await
            }
            None => timeout(self.resolve_timeout, self.resolver.resolve(site_id, &token.access_token)).await,
        };

        match result {
            Ok(Ok(page_id)) => {
                metrics::record_resolution("ok", start);
                Ok(page_id)
            }
            Ok(Err(e)) => {
                metrics::record_resolution("error", start);
                Err(e.into())
            }
            Err(_) => {
                metrics::record_resolution("timeout", start);
                Err(RouteError::Timeout(self.resolve_timeout))
            }
        }
    }
}
