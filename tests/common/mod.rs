//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use site_router::auth::{AccessToken, TokenManager};
use site_router::cache::MemorySiteCache;
use site_router::cms::{PageResolver, ResolveError};
use site_router::config::ProxyConfig;
use site_router::http::HttpServer;
use site_router::lifecycle::Shutdown;
use site_router::routing::RoutingEngine;

/// Start a backend that reads each request head and answers with whatever
/// `respond(addr, head)` returns as a full HTTP/1.1 response.
async fn start_backend<F>(respond: F) -> SocketAddr
where
    F: Fn(SocketAddr, &str) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }

                        let response = respond(addr, &String::from_utf8_lossy(&head));
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that answers every request with its own request line and
/// Host header, one per line.
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(|_, head| {
        let request_line = head.lines().next().unwrap_or_default();
        let host = head
            .lines()
            .find_map(|l| l.strip_prefix("host: ").or_else(|| l.strip_prefix("Host: ")))
            .unwrap_or_default();
        let body = format!("{}\n{}", request_line, host);

        format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    })
    .await
}

/// Start a backend that redirects every request to `path` on its own address.
#[allow(dead_code)]
pub async fn start_redirecting_backend(path: &'static str) -> SocketAddr {
    start_backend(move |addr, _| {
        format!(
            "HTTP/1.1 302 Found\r\nLocation: http://{}{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            addr, path
        )
    })
    .await
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Resolver with a canned answer that counts its calls.
pub struct StubResolver {
    answer: Result<Option<String>, ResolveError>,
    delay: Duration,
    calls: AtomicU32,
}

#[allow(dead_code)]
impl StubResolver {
    pub fn answering(page_id: Option<&str>) -> Arc<Self> {
        Self::build(Ok(page_id.map(str::to_string)), Duration::ZERO)
    }

    pub fn failing(error: ResolveError) -> Arc<Self> {
        Self::build(Err(error), Duration::ZERO)
    }

    pub fn slow(page_id: &str, delay: Duration) -> Arc<Self> {
        Self::build(Ok(Some(page_id.to_string())), delay)
    }

    fn build(answer: Result<Option<String>, ResolveError>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer,
            delay,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageResolver for StubResolver {
    fn resolve<'a>(
        &'a self,
        _site_id: &'a str,
        _access_token: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ResolveError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer.clone();
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            answer
        }
        .boxed()
    }
}

/// A running router bound to an ephemeral port.
pub struct TestRouter {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestRouter {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestRouter {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a router in front of `backend`, routing with `cache` and `resolver`.
pub async fn start_router(
    cache: MemorySiteCache,
    resolver: Arc<StubResolver>,
    backend: SocketAddr,
    config: ProxyConfig,
) -> TestRouter {
    let tokens = Arc::new(TokenManager::new(AccessToken::new("test-token", 3600)));
    let engine = RoutingEngine::new(
        Arc::new(cache),
        resolver,
        tokens,
        format!("http://{}", backend),
        Duration::from_secs(config.timeouts.resolve_secs),
    )
    .with_single_flight(config.routing.single_flight)
    .with_cache_timeout(Duration::from_millis(config.timeouts.cache_ms));

    let server = HttpServer::new(Arc::new(engine), &config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, None, &stop).await;
    });

    TestRouter { addr, shutdown }
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
