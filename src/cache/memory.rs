//! In-process site cache for tests and local development.

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheError, SiteCache, SiteMapping, LANDING_PAGE_FIELD, SITE_ID_FIELD};

/// A thread-safe host → hash store with the same field semantics as Redis.
#[derive(Clone, Default)]
pub struct MemorySiteCache {
    inner: Arc<DashMap<String, HashMap<String, String>>>,
}

impl MemorySiteCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load mappings from a JSON file of `{ "host": { "siteId": "...", ... } }`.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let cache = Self::new();
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let map: HashMap<String, HashMap<String, String>> = serde_json::from_reader(reader)?;

        for (host, fields) in map {
            cache.inner.insert(host, fields);
        }
        tracing::info!("Loaded {} site mappings from {:?}", cache.inner.len(), path);
        Ok(cache)
    }

    /// Provision a host, as the out-of-band administrative process would.
    pub fn insert_site(&self, host: impl Into<String>, site_id: impl Into<String>) {
        let mut fields = HashMap::new();
        fields.insert(SITE_ID_FIELD.to_string(), site_id.into());
        self.inner.insert(host.into(), fields);
    }

    /// Raw hash fields for a host.
    pub fn fields(&self, host: &str) -> Option<HashMap<String, String>> {
        self.inner.get(host).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SiteCache for MemorySiteCache {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Option<SiteMapping>, CacheError>> {
        let mapping = self
            .inner
            .get(host)
            .and_then(|fields| SiteMapping::from_fields(fields.value()));
        Box::pin(async move { Ok(mapping) })
    }

    fn set_landing_page<'a>(
        &'a self,
        host: &'a str,
        landing_page_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        // HSET creates the hash when missing.
        self.inner
            .entry(host.to_string())
            .or_default()
            .insert(LANDING_PAGE_FIELD.to_string(), landing_page_id.to_string());
        Box::pin(async { Ok(()) })
    }
}
