//! CMS authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     oauth.rs (client-credentials handshake)
//!     → manager.rs (store token, arm renewal timer)
//!     → listeners start only after this succeeds
//!
//! Per request (resolution only):
//!     manager.rs current_token() → bearer for the CMS call
//!
//! Renewal:
//!     timer fires at issued_at + expires_in
//!     → oauth.rs handshake
//!     → atomic swap on success, backoff + retry on failure
//! ```
//!
//! # Design Decisions
//! - Proactive renewal instead of reacting to 401s
//! - Lock-free reads of the current token (ArcSwap)
//! - The bearer value is never logged

pub mod manager;
pub mod oauth;
pub mod token;

pub use manager::{RenewalPolicy, TokenManager};
pub use oauth::{OAuthClient, TokenSource};
pub use token::{AccessToken, AuthError};
