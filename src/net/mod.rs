//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Plain HTTP:
//!     listener.rs (bind) → axum::serve
//!
//! TLS:
//!     tls.rs (load key, certificate, CA bundle) → axum_server rustls acceptor
//! ```
//!
//! # Design Decisions
//! - TLS material is loaded once at startup; a bad file is fatal
//! - Client certificates are never requested
//! - Both listeners share one routing engine

pub mod listener;
pub mod tls;

pub use listener::{bind, parse_addr, ListenerError};
pub use tls::{load_tls_config, TlsError, TlsListener};
