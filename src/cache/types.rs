//! Site mapping record and cache errors.

use std::collections::HashMap;
use thiserror::Error;

/// Hash field holding the CMS site identifier.
pub const SITE_ID_FIELD: &str = "siteId";

/// Hash field holding the resolved landing page identifier.
pub const LANDING_PAGE_FIELD: &str = "landingPageId";

/// Cached association between a hostname and its CMS identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteMapping {
    pub site_id: String,
    /// `None` until the landing page has been resolved.
    pub landing_page_id: Option<String>,
}

impl SiteMapping {
    /// Build a mapping from the raw hash fields.
    ///
    /// An empty hash (the store's answer for a missing key) or a hash without
    /// `siteId` is a miss. An empty `landingPageId` counts as unresolved.
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        let site_id = fields.get(SITE_ID_FIELD).filter(|s| !s.is_empty())?.clone();
        let landing_page_id = fields
            .get(LANDING_PAGE_FIELD)
            .filter(|s| !s.is_empty())
            .cloned();

        Some(Self {
            site_id,
            landing_page_id,
        })
    }
}

/// Errors from the site cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be reached or rejected the command.
    #[error("Site cache unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}
