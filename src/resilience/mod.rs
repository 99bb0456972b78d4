//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Token renewal failure:
//!     → backoff.rs (exponential delay with jitter)
//!     → retry until success or the attempt limit
//!
//! Landing page resolution:
//!     → fixed deadline (tokio::time::timeout), call dropped on expiry
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Jittered backoff prevents synchronized retries across instances
//! - Per-request failures never retry; the next request tries again

pub mod backoff;

pub use backoff::{calculate_backoff, BackoffPolicy};
