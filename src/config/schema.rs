//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the site router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Plain HTTP listener.
    pub listener: ListenerConfig,

    /// Optional TLS listener.
    pub tls: Option<TlsConfig>,

    /// Backend that receives passthrough traffic.
    pub backend: BackendConfig,

    /// OAuth2 client-credentials settings.
    pub oauth: OAuthConfig,

    /// CMS composition API settings.
    pub cms: CmsConfig,

    /// Site cache settings.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Routing engine behaviour.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
        }
    }
}

/// TLS listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Bind address for the TLS listener (e.g., "0.0.0.0:443").
    #[serde(default = "default_tls_bind")]
    pub bind_address: String,

    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// Path to the CA bundle (PEM), appended to the served chain.
    pub ca_path: String,

    /// Redirect plain HTTP requests to HTTPS before routing.
    #[serde(default)]
    pub redirect_plain: bool,
}

fn default_tls_bind() -> String {
    "0.0.0.0:443".to_string()
}

/// Passthrough backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL that passthrough paths are appended to (e.g., "http://app:3000").
    pub target: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            target: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// OAuth2 client-credentials configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,

    /// Token host; falls back to `cms.api_endpoint` when unset.
    pub token_host: Option<String>,

    pub token_path: String,

    /// Consecutive renewal failures tolerated before the process shuts down.
    /// Zero retries forever.
    pub renewal_max_attempts: u32,

    /// Base delay for renewal backoff in milliseconds.
    pub renewal_base_delay_ms: u64,

    /// Maximum delay for renewal backoff in milliseconds.
    pub renewal_max_delay_ms: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_host: None,
            token_path: "/oauth/token".to_string(),
            renewal_max_attempts: 10,
            renewal_base_delay_ms: 500,
            renewal_max_delay_ms: 30_000,
        }
    }
}

impl OAuthConfig {
    /// Full token endpoint URL.
    pub fn token_url(&self, api_endpoint: &str) -> String {
        let host = self.token_host.as_deref().unwrap_or(api_endpoint);
        format!("{}{}", host.trim_end_matches('/'), self.token_path)
    }
}

/// CMS composition API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CmsConfig {
    /// API base URL (e.g., "https://cms.example.com").
    pub api_endpoint: String,
}

/// Which store backs the site cache.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
}

/// Site cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Full Redis URL. Takes precedence over the discrete fields below.
    pub url: Option<String>,

    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,

    /// JSON seed file for the memory backend.
    pub seed_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            url: None,
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            seed_path: None,
        }
    }
}

impl CacheConfig {
    /// Connection URL for the Redis client.
    pub fn redis_url(&self) -> Result<String, url::ParseError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = url::Url::parse(&format!("redis://{}:{}/{}", self.host, self.port, self.db))?;
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            // Only fails for cannot-be-a-base URLs, which redis:// never is.
            let _ = url.set_password(Some(password));
        }
        Ok(url.to_string())
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a landing page resolution in seconds.
    pub resolve_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    /// Must exceed `resolve_secs`.
    pub request_secs: u64,

    /// Deadline for a single site cache read or write in milliseconds.
    pub cache_ms: u64,

    /// Timeout for OAuth token requests in seconds.
    pub token_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            resolve_secs: 5,
            request_secs: 30,
            cache_ms: 1000,
            token_secs: 30,
        }
    }
}

/// Routing engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Share one CMS call between concurrent requests for the same host.
    pub single_flight: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { single_flight: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_url_from_parts() {
        let config = CacheConfig {
            host: "redis.internal".into(),
            port: 6380,
            password: Some("s3cret".into()),
            db: 2,
            ..Default::default()
        };
        assert_eq!(config.redis_url().unwrap(), "redis://:s3cret@redis.internal:6380/2");

        let explicit = CacheConfig {
            url: Some("redis://other:6379/0".into()),
            ..config
        };
        assert_eq!(explicit.redis_url().unwrap(), "redis://other:6379/0");
    }

    #[test]
    fn test_token_url_falls_back_to_api_endpoint() {
        let mut oauth = OAuthConfig::default();
        assert_eq!(oauth.token_url("https://cms.example.com/"), "https://cms.example.com/oauth/token");

        oauth.token_host = Some("https://id.example.com".into());
        assert_eq!(oauth.token_url("https://cms.example.com"), "https://id.example.com/oauth/token");
    }

    #[test]
    fn test_minimal_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [backend]
            target = "http://app:8080"

            [tls]
            cert_path = "cert.pem"
            key_path = "key.pem"
            ca_path = "ca.pem"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.target, "http://app:8080");
        assert_eq!(config.timeouts.resolve_secs, 5);
        let tls = config.tls.unwrap();
        assert_eq!(tls.bind_address, "0.0.0.0:443");
        assert!(!tls.redirect_plain);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
    }
}
