//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → request.rs (Host, path, scheme of the listener)
//!     → [routing engine decides]
//!     → forward.rs (passthrough to the backend)
//!       or response.rs (302 to landing page, /404, /500)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder};
pub use request::{InboundScheme, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
