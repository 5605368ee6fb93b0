//! Per-connection channel context

/// Identifier assigned to a client connection for its lifetime.
///
/// Identifiers are allocated by the gateway's connection table; `0` is the
/// free-slot sentinel and is never assigned to a live connection.
pub type ConnectionId = u32;

/// Context carried by one client connection.
///
/// The gateway binds the connection identifier at open; the authenticator
/// and access checker establish the authorization state afterwards. The
/// gateway itself treats everything beyond the identifier as opaque.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    connection_id: ConnectionId,
    authorized: bool,
    token: Option<String>,
}

impl Channel {
    /// Create a channel bound to a connection identifier.
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            authorized: false,
            token: None,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Mark the channel authorized and remember the validated token.
    pub fn set_authorized(&mut self, token: impl Into<String>) {
        self.authorized = true;
        self.token = Some(token.into());
    }

    /// Drop the authorization state, e.g. when a token expires.
    pub fn clear_authorization(&mut self) {
        self.authorized = false;
        self.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_channel_is_unauthorized() {
        let channel = Channel::new(1_000_000);
        assert_eq!(channel.connection_id(), 1_000_000);
        assert!(!channel.is_authorized());
        assert!(channel.token().is_none());
    }

    #[test]
    fn authorization_roundtrip() {
        let mut channel = Channel::new(2_000_000);
        channel.set_authorized("tok");
        assert!(channel.is_authorized());
        assert_eq!(channel.token(), Some("tok"));

        channel.clear_authorization();
        assert!(!channel.is_authorized());
        assert!(channel.token().is_none());
    }
}
