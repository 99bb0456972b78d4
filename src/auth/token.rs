//! Access token and authentication errors.

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// An OAuth2 bearer token obtained through the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
    pub issued_at: Instant,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in,
            issued_at: Instant::now(),
        }
    }

    /// Time after issuance at which the token should be renewed.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }

    /// Instant at which renewal is due.
    pub fn renew_at(&self) -> Instant {
        self.issued_at + self.lifetime()
    }
}

// Never print the bearer value.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Errors from the client-credentials handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Transport failure talking to the token endpoint.
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status.
    #[error("Token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response did not contain a usable token.
    #[error("Malformed token response: {0}")]
    Malformed(String),
}
