//! Forwarding passthrough requests to the backend.
//!
//! # Responsibilities
//! - Send the request to a pre-composed absolute target URL
//! - Preserve method, headers and streaming body
//! - Rewrite Host to the target authority
//! - Strip hop-by-hop headers in both directions
//! - Point backend redirects at the host the client used

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri};
use axum::response::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::request::InboundScheme;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Invalid forward target {0}")]
    InvalidTarget(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Statuses whose `Location` is rewritten.
const REWRITTEN_STATUSES: [StatusCode; 5] = [
    StatusCode::CREATED,
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// Replace the backend's own scheme and authority in an absolute `Location`
/// with the inbound ones. Relative locations and foreign hosts are left alone.
fn rewrite_location(
    headers: &mut HeaderMap,
    status: StatusCode,
    backend_authority: &str,
    scheme: InboundScheme,
    host: &str,
) {
    if !REWRITTEN_STATUSES.contains(&status) {
        return;
    }
    let Some(location) = headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uri>().ok())
    else {
        return;
    };
    if location.authority().map(|a| a.as_str()) != Some(backend_authority) {
        return;
    }

    let path = location.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    if let Ok(value) = HeaderValue::from_str(&format!("{}://{}{}", scheme.as_str(), host, path)) {
        headers.insert(header::LOCATION, value);
    }
}

/// HTTP client for the passthrough backend.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl Forwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }

    /// Forward `request` to `target`, an absolute URL that already includes
    /// the path and query. The inbound URI is ignored; `scheme` and `host`
    /// describe how the client reached us.
    pub async fn forward(
        &self,
        request: Request<Body>,
        target: &str,
        scheme: InboundScheme,
        host: &str,
    ) -> Result<Response, ForwardError> {
        let uri: Uri = target
            .parse()
            .map_err(|_| ForwardError::InvalidTarget(target.to_string()))?;
        let authority = uri
            .authority()
            .ok_or_else(|| ForwardError::InvalidTarget(target.to_string()))?;
        let backend_authority = authority.as_str().to_string();
        let backend_host = HeaderValue::from_str(&backend_authority)
            .map_err(|_| ForwardError::InvalidTarget(target.to_string()))?;

        let (parts, body) = request.into_parts();
        let mut upstream = Request::builder()
            .method(parts.method)
            .uri(uri.clone())
            .body(body)
            .map_err(|_| ForwardError::InvalidTarget(target.to_string()))?;

        let headers = upstream.headers_mut();
        *headers = parts.headers;
        strip_hop_by_hop(headers);
        headers.insert(header::HOST, backend_host);

        let response = self.client.request(upstream).await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        rewrite_location(&mut parts.headers, parts.status, &backend_authority, scheme, host);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
