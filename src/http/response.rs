//! Response dispatch.
//!
//! # Responsibilities
//! - Issue 302 redirects to resolved landing pages
//! - Issue soft error redirects to the application's `/404` and `/500` pages
//! - Upgrade plain HTTP to HTTPS when configured
//!
//! # Design Decisions
//! - Error outcomes are redirects, never error bodies
//! - Location is absolute, on the host and scheme the client used

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::request::InboundScheme;

/// Path of the application's not-found page.
pub const NOT_FOUND_PATH: &str = "/404";

/// Path of the application's server-error page.
pub const SERVER_ERROR_PATH: &str = "/500";

fn found(location: String) -> Response {
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::FOUND;
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        // Only reachable with a Host header that was not valid to begin with.
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// 302 to `path` on the requesting host.
pub fn redirect(scheme: InboundScheme, host: &str, path: &str) -> Response {
    found(format!("{}://{}{}", scheme.as_str(), host, path))
}

pub fn not_found(scheme: InboundScheme, host: &str) -> Response {
    redirect(scheme, host, NOT_FOUND_PATH)
}

pub fn server_error(scheme: InboundScheme, host: &str) -> Response {
    redirect(scheme, host, SERVER_ERROR_PATH)
}

/// 302 to the same resource over HTTPS.
pub fn to_https(host: &str, path_and_query: &str) -> Response {
    redirect(InboundScheme::Https, host, path_and_query)
}

/// The backend could not be reached.
pub fn bad_gateway() -> Response {
    StatusCode::BAD_GATEWAY.into_response()
}

/// The backend did not answer within the request deadline.
pub fn gateway_timeout() -> Response {
    StatusCode::GATEWAY_TIMEOUT.into_response()
}

pub fn missing_host() -> Response {
    (StatusCode::BAD_REQUEST, "Missing Host header").into_response()
}
