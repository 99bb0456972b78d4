//! Site cache subsystem.
//!
//! # Data Flow
//! ```text
//! Host header
//!     → SiteCache::lookup (HGETALL host)
//!     → SiteMapping { site_id, landing_page_id? }
//!
//! Landing page resolved
//!     → SiteCache::set_landing_page (HSET host landingPageId id)
//! ```
//!
//! # Design Decisions
//! - One hash per hostname, exactly as provisioned out-of-band
//! - No TTL, no eviction, no local copy beyond a single request
//! - Writes are idempotent single-field updates (last write wins)
//! - Store errors are request-fatal, never process-fatal

pub mod memory;
pub mod redis_store;
pub mod types;

use futures_util::future::BoxFuture;

pub use memory::MemorySiteCache;
pub use redis_store::RedisSiteCache;
pub use types::{CacheError, SiteMapping, LANDING_PAGE_FIELD, SITE_ID_FIELD};

/// Read/write access to host → site mappings.
pub trait SiteCache: Send + Sync {
    /// Fetch the mapping for `host`. `Ok(None)` when the host is unknown.
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Option<SiteMapping>, CacheError>>;

    /// Record the resolved landing page for `host`.
    fn set_landing_page<'a>(
        &'a self,
        host: &'a str,
        landing_page_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CacheError>>;
}
