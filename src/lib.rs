//! Hostname-based router for multi-tenant site hosting.
//!
//! Requests for assets, pages and API calls pass through to the application
//! backend. Anything else is a request for a site's front door and gets
//! redirected to that site's landing page, resolved through the CMS and
//! remembered in Redis.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Site resolution
pub mod auth;
pub mod cache;
pub mod cms;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{RoutingDecision, RoutingEngine};
