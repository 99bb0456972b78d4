//! Request inspection.
//!
//! # Responsibilities
//! - Identify the scheme of the listener a request arrived on
//! - Extract the routing key (Host header, as received)
//! - Extract the request ID set by the request-id layer

use axum::body::Body;
use axum::http::{header, Request};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Whether the inbound connection was encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundScheme {
    Http,
    Https,
}

impl InboundScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            InboundScheme::Http => "http",
            InboundScheme::Https => "https",
        }
    }
}

/// The Host the client asked for, byte-for-byte (port included).
///
/// HTTP/2 requests carry it in the `:authority` pseudo-header instead.
pub fn host_of(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))
        .filter(|h| !h.is_empty())
}

/// Path plus query string, `/` when the URI has neither.
pub fn path_and_query(request: &Request<Body>) -> String {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

pub fn request_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
