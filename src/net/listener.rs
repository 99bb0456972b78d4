//! TCP listener binding.

use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The configured address is not a socket address.
    Address(String),
    /// Failed to bind to address.
    Bind(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(a) => write!(f, "Invalid bind address: {}", a),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Parse a configured bind address.
pub fn parse_addr(bind_address: &str) -> Result<SocketAddr, ListenerError> {
    bind_address
        .parse()
        .map_err(|_| ListenerError::Address(bind_address.to_string()))
}

/// Bind the plain HTTP listener.
pub async fn bind(bind_address: &str) -> Result<TcpListener, ListenerError> {
    let addr = parse_addr(bind_address)?;
    let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;

    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}
