//! CMS composition API client.

use futures_util::future::BoxFuture;

use crate::cms::{Composition, ResolveError};

/// Finds the landing page of a CMS site.
pub trait PageResolver: Send + Sync {
    /// `Ok(None)` when the site has no navigation pages.
    fn resolve<'a>(
        &'a self,
        site_id: &'a str,
        access_token: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ResolveError>>;
}

/// HTTP client for `GET {api_endpoint}/v1/compositions/{site_id}`.
#[derive(Clone)]
pub struct CmsClient {
    http: reqwest::Client,
    api_endpoint: String,
}

impl CmsClient {
    pub fn new(http: reqwest::Client, api_endpoint: impl Into<String>) -> Self {
        Self {
            http,
            api_endpoint: api_endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn composition_url(&self, site_id: &str) -> String {
        format!("{}/v1/compositions/{}", self.api_endpoint, site_id)
    }

    pub async fn landing_page_id(&self, site_id: &str, access_token: &str) -> Result<Option<String>, ResolveError> {
        let response = self
            .http
            .get(self.composition_url(site_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;
        let composition: Composition = serde_json::from_slice(&body)
            .map_err(|e| ResolveError::Malformed(e.to_string()))?;

        let landing = composition.landing_page_id()?;
        tracing::debug!(
            site_id = %site_id,
            pages = composition.pages.len(),
            landing_page_id = ?landing,
            "Fetched composition"
        );
        Ok(landing)
    }
}

impl PageResolver for CmsClient {
    fn resolve<'a>(
        &'a self,
        site_id: &'a str,
        access_token: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ResolveError>> {
        Box::pin(self.landing_page_id(site_id, access_token))
    }
}
