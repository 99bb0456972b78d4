//! TLS configuration and certificate loading.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

/// Errors while loading TLS material.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No PEM certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("No private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("Invalid TLS configuration: {0}")]
    Config(std::io::Error),
}

/// A TLS listener ready to be served.
#[derive(Clone)]
pub struct TlsListener {
    pub addr: SocketAddr,
    pub config: RustlsConfig,
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, TlsError> {
    tokio::fs::read(path).await.map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn count_certs(pem: &[u8], path: &Path) -> Result<usize, TlsError> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs.len())
}

/// Load the server certificate, private key, and CA bundle.
///
/// The CA bundle is appended to the served chain. Client certificates are not
/// requested.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path, ca_path: &Path) -> Result<RustlsConfig, TlsError> {
    let cert = read_pem(cert_path).await?;
    let key = read_pem(key_path).await?;
    let ca = read_pem(ca_path).await?;

    let leaf_count = count_certs(&cert, cert_path)?;
    let ca_count = count_certs(&ca, ca_path)?;

    match rustls_pemfile::private_key(&mut &key[..]) {
        Ok(Some(_)) => {}
        Ok(None) => return Err(TlsError::NoPrivateKey(key_path.to_path_buf())),
        Err(source) => {
            return Err(TlsError::Read {
                path: key_path.to_path_buf(),
                source,
            })
        }
    }

    let mut chain = cert;
    if !chain.ends_with(b"\n") {
        chain.push(b'\n');
    }
    chain.extend_from_slice(&ca);

    tracing::info!(
        cert = ?cert_path,
        certificates = leaf_count,
        ca_certificates = ca_count,
        "TLS material loaded"
    );

    RustlsConfig::from_pem(chain, key).await.map_err(TlsError::Config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_files() {
        let err = load_tls_config(
            Path::new("/nonexistent/cert.pem"),
            Path::new("/nonexistent/key.pem"),
            Path::new("/nonexistent/ca.pem"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TlsError::Read { .. }));
    }

    #[tokio::test]
    async fn test_rejects_files_without_certificates() {
        let dir = std::env::temp_dir();
        let cert = dir.join(format!("site-router-empty-cert-{}.pem", std::process::id()));
        std::fs::write(&cert, "not a certificate\n").unwrap();

        let err = load_tls_config(&cert, &cert, &cert).await.unwrap_err();
        assert!(matches!(err, TlsError::NoCertificates(_)));

        std::fs::remove_file(&cert).unwrap_or_default();
    }
}
