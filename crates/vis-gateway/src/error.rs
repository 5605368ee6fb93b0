//! Gateway errors

use thiserror::Error;

/// Errors from the connection gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Every table slot holds a live connection; the new client is
    /// rejected at open
    #[error("connection table is full ({capacity} live connections)")]
    TableFull { capacity: usize },

    /// Certificate or key material could not be loaded or was rejected
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// The backing store failed to load; the listener was never started
    #[error("signal store initialization failed: {0}")]
    Store(#[from] vis_core::StoreError),

    /// Listener I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
