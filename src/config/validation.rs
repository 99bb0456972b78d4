//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs before anything binds or connects
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use crate::config::schema::{CacheBackend, ProxyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }

    if let Some(tls) = &config.tls {
        if tls.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new("tls.bind_address", "not a socket address"));
        }
        if tls.bind_address == config.listener.bind_address {
            errors.push(ValidationError::new("tls.bind_address", "must differ from listener.bind_address"));
        }
    }

    match url::Url::parse(&config.backend.target) {
        Ok(url) if url.scheme() == "http" && url.host_str().is_some() => {}
        Ok(_) => errors.push(ValidationError::new("backend.target", "must be an http:// URL with a host")),
        Err(e) => errors.push(ValidationError::new("backend.target", e.to_string())),
    }

    if let Err(e) = url::Url::parse(&config.cms.api_endpoint) {
        errors.push(ValidationError::new("cms.api_endpoint", e.to_string()));
    }
    if let Err(e) = url::Url::parse(&config.oauth.token_url(&config.cms.api_endpoint)) {
        errors.push(ValidationError::new("oauth.token_host", e.to_string()));
    }
    if config.oauth.client_id.is_empty() {
        errors.push(ValidationError::new("oauth.client_id", "must be set"));
    }
    if config.oauth.client_secret.is_empty() {
        errors.push(ValidationError::new("oauth.client_secret", "must be set"));
    }

    if config.cache.backend == CacheBackend::Redis {
        if let Err(e) = config.cache.redis_url() {
            errors.push(ValidationError::new("cache", e.to_string()));
        }
    }

    if config.timeouts.resolve_secs == 0 {
        errors.push(ValidationError::new("timeouts.resolve_secs", "must be greater than zero"));
    }
    if config.timeouts.request_secs <= config.timeouts.resolve_secs {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than timeouts.resolve_secs"));
    }
    if config.timeouts.cache_ms == 0 {
        errors.push(ValidationError::new("timeouts.cache_ms", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
