//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the single catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Bound each request by the request deadline
//! - Serve the plain listener and, when configured, the TLS listener
//! - Dispatch each request on the routing engine's decision

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::forward::Forwarder;
use crate::http::request::{host_of, path_and_query, request_id, InboundScheme};
use crate::http::response;
use crate::lifecycle::Shutdown;
use crate::net::TlsListener;
use crate::observability::metrics;
use crate::routing::{RouteError, RoutingDecision, RoutingEngine};

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RoutingEngine>,
    pub forwarder: Forwarder,
    pub scheme: InboundScheme,
    pub redirect_plain: bool,
    /// Deadline for routing, and separately for the backend's response head.
    pub request_timeout: Duration,
}

/// HTTP(S) front end of the router.
pub struct HttpServer {
    engine: Arc<RoutingEngine>,
    forwarder: Forwarder,
    request_timeout: Duration,
    redirect_plain: bool,
}

impl HttpServer {
    pub fn new(engine: Arc<RoutingEngine>, config: &ProxyConfig) -> Self {
        Self {
            engine,
            forwarder: Forwarder::new(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            redirect_plain: config.tls.as_ref().is_some_and(|tls| tls.redirect_plain),
        }
    }

    /// Build the Axum router for one listener.
    pub fn router(&self, scheme: InboundScheme) -> Router {
        let state = AppState {
            engine: self.engine.clone(),
            forwarder: self.forwarder.clone(),
            scheme,
            redirect_plain: self.redirect_plain && scheme == InboundScheme::Http,
            request_timeout: self.request_timeout,
        };

        Router::new()
            .route("/{*path}", any(route_handler))
            .route("/", any(route_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve until `shutdown` fires. With `tls`, both listeners run and a
    /// failure of either ends the server.
    pub async fn run(
        self,
        listener: TcpListener,
        tls: Option<TlsListener>,
        shutdown: &Shutdown,
    ) -> Result<(), std::io::Error> {
        let plain = serve_plain(self.router(InboundScheme::Http), listener, shutdown.subscribe());

        match tls {
            Some(tls) => {
                let secure = serve_tls(self.router(InboundScheme::Https), tls, shutdown.subscribe());
                tokio::try_join!(plain, secure)?;
            }
            None => plain.await?,
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn serve_plain(
    router: Router,
    listener: TcpListener,
    mut stop: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "HTTP listener serving");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = stop.recv().await;
        })
        .await
}

async fn serve_tls(
    router: Router,
    tls: TlsListener,
    mut stop: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let handle = axum_server::Handle::new();
    let drain = handle.clone();
    tokio::spawn(async move {
        let _ = stop.recv().await;
        drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
    });

    tracing::info!(address = %tls.addr, "HTTPS listener serving");
    axum_server::bind_rustls(tls.addr, tls.config)
        .handle(handle)
        .serve(router.into_make_service())
        .await
}

/// Main handler. Asks the engine what to do with the request, then does it.
async fn route_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);

    let Some(host) = host_of(&request) else {
        tracing::warn!(request_id = %request_id, "Request without Host header");
        return response::missing_host();
    };
    let path = request.uri().path().to_string();
    let path_and_query = path_and_query(&request);

    if state.redirect_plain {
        return response::to_https(&host, &path_and_query);
    }

    tracing::debug!(
        request_id = %request_id,
        host = %host,
        method = %request.method(),
        path = %path,
        "Routing request"
    );

    // An elapsed deadline drops the routing future, which releases any
    // in-flight resolution it joined.
    let decision = timeout(state.request_timeout, state.engine.route(&host, &path, &path_and_query))
        .await
        .unwrap_or(RoutingDecision::ServerError(RouteError::RequestTimeout(state.request_timeout)));
    let label = decision.label();

    let response = match decision {
        RoutingDecision::Passthrough(target) => {
            let forward = state.forwarder.forward(request, &target, state.scheme, &host);
            match timeout(state.request_timeout, forward).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::error!(request_id = %request_id, target = %target, error = %e, "Upstream error");
                    metrics::record_forward_error();
                    response::bad_gateway()
                }
                Err(_) => {
                    tracing::error!(request_id = %request_id, target = %target, "Upstream timed out");
                    metrics::record_forward_error();
                    response::gateway_timeout()
                }
            }
        }
        RoutingDecision::Redirect(landing) => response::redirect(state.scheme, &host, &landing),
        RoutingDecision::NotFound => response::not_found(state.scheme, &host),
        RoutingDecision::ServerError(e) => {
            tracing::error!(request_id = %request_id, host = %host, error = %e, "Routing failed");
            response::server_error(state.scheme, &host)
        }
    };

    metrics::record_decision(label, start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, TokenManager};
    use crate::cache::MemorySiteCache;
    use crate::cms::{PageResolver, ResolveError};
    use axum::http::{header, StatusCode};
    use futures_util::future::{BoxFuture, FutureExt};
    use tower::ServiceExt;

    struct FixedResolver {
        answer: Option<String>,
        delay: Duration,
    }

    impl PageResolver for FixedResolver {
        fn resolve<'a>(
            &'a self,
            _site_id: &'a str,
            _access_token: &'a str,
        ) -> BoxFuture<'a, Result<Option<String>, ResolveError>> {
            let answer = self.answer.clone();
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                Ok(answer)
            }
            .boxed()
        }
    }

    fn server_with(
        cache: MemorySiteCache,
        redirect_plain: bool,
        resolve_delay: Duration,
        request_timeout: Duration,
    ) -> HttpServer {
        let tokens = Arc::new(TokenManager::new(AccessToken::new("t", 3600)));
        let resolver = FixedResolver {
            answer: Some("42".to_string()),
            delay: resolve_delay,
        };
        let engine = RoutingEngine::new(
            Arc::new(cache),
            Arc::new(resolver),
            tokens,
            "http://127.0.0.1:9",
            Duration::from_secs(5),
        );
        HttpServer {
            engine: Arc::new(engine),
            forwarder: Forwarder::new(),
            request_timeout,
            redirect_plain,
        }
    }

    fn server(cache: MemorySiteCache, redirect_plain: bool) -> HttpServer {
        server_with(cache, redirect_plain, Duration::ZERO, Duration::from_secs(10))
    }

    fn get(host: Option<&str>, uri: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_scheme_follows_listener() {
        let cache = MemorySiteCache::new();
        cache.insert_site("shop.example.com", "s1");
        let server = server(cache, false);

        let plain = server
            .router(InboundScheme::Http)
            .oneshot(get(Some("shop.example.com"), "/"))
            .await
            .unwrap();
        assert_eq!(plain.status(), StatusCode::FOUND);
        assert_eq!(plain.headers()[header::LOCATION], "http://shop.example.com/p/42");

        let secure = server
            .router(InboundScheme::Https)
            .oneshot(get(Some("shop.example.com"), "/about"))
            .await
            .unwrap();
        assert_eq!(secure.headers()[header::LOCATION], "https://shop.example.com/p/42");
    }

    #[tokio::test]
    async fn test_missing_host_is_bad_request() {
        let server = server(MemorySiteCache::new(), false);
        let response = server
            .router(InboundScheme::Http)
            .oneshot(get(None, "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_host_redirects_to_404() {
        let server = server(MemorySiteCache::new(), false);
        let response = server
            .router(InboundScheme::Http)
            .oneshot(get(Some("nobody.example.com"), "/"))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::LOCATION], "http://nobody.example.com/404");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_bad_gateway() {
        let server = server(MemorySiteCache::new(), false);
        let response = server
            .router(InboundScheme::Http)
            .oneshot(get(Some("shop.example.com"), "/500"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_redirect_plain_only_on_http_listener() {
        let cache = MemorySiteCache::new();
        cache.insert_site("shop.example.com", "s1");
        let server = server(cache, true);

        let plain = server
            .router(InboundScheme::Http)
            .oneshot(get(Some("shop.example.com"), "/app.js?v=2"))
            .await
            .unwrap();
        assert_eq!(plain.headers()[header::LOCATION], "https://shop.example.com/app.js?v=2");

        let secure = server
            .router(InboundScheme::Https)
            .oneshot(get(Some("shop.example.com"), "/"))
            .await
            .unwrap();
        assert_eq!(secure.headers()[header::LOCATION], "https://shop.example.com/p/42");
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let server = server(MemorySiteCache::new(), false);
        let response = server
            .router(InboundScheme::Http)
            .oneshot(get(Some("nobody.example.com"), "/"))
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline_redirects_to_server_error() {
        let cache = MemorySiteCache::new();
        cache.insert_site("shop.example.com", "s1");
        let server = server_with(cache, false, Duration::from_secs(3), Duration::from_secs(1));

        let response = server
            .router(InboundScheme::Http)
            .oneshot(get(Some("shop.example.com"), "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "http://shop.example.com/500");
    }
}
