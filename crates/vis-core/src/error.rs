//! Errors surfaced by collaborator implementations

use thiserror::Error;

/// Token validation failures reported by an [`crate::Authenticator`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token is malformed or signed by an unknown party
    #[error("invalid token")]
    InvalidToken,

    /// The token was valid once but its validity period has passed
    #[error("token expired")]
    TokenExpired,
}

/// Failures while loading the signal-tree backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file could not be read
    #[error("failed to read store file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The store file was read but its contents are not usable
    #[error("malformed store file '{path}': {reason}")]
    Malformed { path: String, reason: String },
}
