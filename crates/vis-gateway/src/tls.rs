//! Optional TLS acceptor for the gateway listener

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use tokio_rustls::{rustls, TlsAcceptor};

use crate::config::TlsConfig;
use crate::error::GatewayError;

/// Build the acceptor for an encrypted listener, or `None` when the
/// server runs in plaintext mode.
pub(crate) fn build_acceptor(config: &TlsConfig) -> Result<Option<TlsAcceptor>, GatewayError> {
    if !config.enabled {
        return Ok(None);
    }
    let certs = load_certs(&config.cert_path)?;
    let key = load_key(&config.key_path)?;
    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| GatewayError::Tls(e.to_string()))?;
    Ok(Some(TlsAcceptor::from(Arc::new(server_config))))
}

fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, GatewayError> {
    let file = File::open(path)
        .map_err(|e| GatewayError::Tls(format!("failed to open certificate file '{path}': {e}")))?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| GatewayError::Tls(format!("failed to parse certificates in '{path}': {e}")))?;
    if certs.is_empty() {
        return Err(GatewayError::Tls(format!(
            "no certificates found in '{path}'"
        )));
    }
    Ok(certs)
}

fn load_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>, GatewayError> {
    let file = File::open(path)
        .map_err(|e| GatewayError::Tls(format!("failed to open private key file '{path}': {e}")))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| GatewayError::Tls(format!("failed to parse private key in '{path}': {e}")))?
        .ok_or_else(|| GatewayError::Tls(format!("no private key found in '{path}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tls_builds_no_acceptor() {
        let acceptor = build_acceptor(&TlsConfig::default()).unwrap();
        assert!(acceptor.is_none());
    }

    #[test]
    fn missing_certificate_file_is_reported() {
        let config = TlsConfig {
            enabled: true,
            cert_path: "/nonexistent/server.pem".to_string(),
            key_path: "/nonexistent/server.key".to_string(),
        };
        assert!(matches!(
            build_acceptor(&config),
            Err(GatewayError::Tls(_))
        ));
    }
}
