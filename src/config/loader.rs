//! Configuration loading from disk and the process environment.

use std::path::Path;
use std::fs;
use crate::config::schema::{ProxyConfig, TlsConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, value } => write!(f, "Invalid value for {}: {:?}", key, value),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: optional TOML file, then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` is `std::env::var` in production; tests pass a map.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(port) = get("PORT") {
        let port: u16 = parse_env("PORT", &port)?;
        config.listener.bind_address = format!("0.0.0.0:{}", port);
    }
    if let Some(target) = get("TARGET_HOST") {
        config.backend.target = target;
    }

    if let Some(id) = get("CLIENT_ID") {
        config.oauth.client_id = id;
    }
    if let Some(secret) = get("CLIENT_SECRET") {
        config.oauth.client_secret = secret;
    }
    if let Some(host) = get("TOKEN_HOST") {
        config.oauth.token_host = Some(host);
    }
    if let Some(endpoint) = get("API_ENDPOINT") {
        config.cms.api_endpoint = endpoint;
    }

    if let Some(url) = get("REDIS_URL") {
        config.cache.url = Some(url);
    }
    if let Some(host) = get("REDIS_HOST") {
        config.cache.host = host;
    }
    if let Some(port) = get("REDIS_PORT") {
        config.cache.port = parse_env("REDIS_PORT", &port)?;
    }
    if let Some(password) = get("REDIS_PASSWORD") {
        config.cache.password = Some(password);
    }
    if let Some(db) = get("REDIS_DB") {
        config.cache.db = parse_env("REDIS_DB", &db)?;
    }

    // TLS is only enabled when all three files are given.
    if let (Some(key_path), Some(cert_path), Some(ca_path)) =
        (get("SSL_KEY_FILE"), get("SSL_CERT_FILE"), get("SSL_CA_FILE"))
    {
        let port: u16 = match get("SSL_PORT") {
            Some(p) => parse_env("SSL_PORT", &p)?,
            None => 443,
        };
        let redirect_plain = config.tls.as_ref().map(|t| t.redirect_plain).unwrap_or(false);
        config.tls = Some(TlsConfig {
            bind_address: format!("0.0.0.0:{}", port),
            cert_path,
            key_path,
            ca_path,
            redirect_plain,
        });
    }

    if let Some(level) = get("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Env {
        key,
        value: value.to_string(),
    })
}
