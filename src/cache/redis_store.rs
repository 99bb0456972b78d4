//! Redis-backed site cache.

use std::collections::HashMap;
use futures_util::future::BoxFuture;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::cache::{CacheError, SiteCache, SiteMapping, LANDING_PAGE_FIELD};

/// Site cache over a multiplexed Redis connection.
///
/// `ConnectionManager` reconnects on its own; cloning it is cheap and shares
/// the underlying connection.
#[derive(Clone)]
pub struct RedisSiteCache {
    conn: ConnectionManager,
}

impl RedisSiteCache {
    /// Connect to Redis. Fails if the server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!("Connected to site cache");
        Ok(Self { conn })
    }
}

impl SiteCache for RedisSiteCache {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Option<SiteMapping>, CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let fields: HashMap<String, String> = conn.hgetall(host).await?;
            Ok(SiteMapping::from_fields(&fields))
        })
    }

    fn set_landing_page<'a>(
        &'a self,
        host: &'a str,
        landing_page_id: &'a str,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: () = conn.hset(host, LANDING_PAGE_FIELD, landing_page_id).await?;
            tracing::debug!(host = %host, landing_page_id = %landing_page_id, "Stored landing page");
            Ok(())
        })
    }
}
