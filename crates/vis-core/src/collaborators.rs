//! Collaborator traits wired into the gateway and daemon
//!
//! The gateway invokes [`CommandProcessor`] for every inbound message and
//! [`SubscriptionHandler`] when a connection goes away, and calls
//! [`SignalStore::initialize`] once before accepting traffic.
//! [`Authenticator`] and [`AccessChecker`] belong to the same collaborator
//! surface but are driven by the command processor, not by the gateway.

use async_trait::async_trait;

use crate::channel::{Channel, ConnectionId};
use crate::error::{AuthError, StoreError};

/// Interprets one inbound client request and produces the reply text.
///
/// Invoked once per message; expected to return promptly (no streaming).
/// Protocol-level failures are encoded in the reply text, never raised
/// across the gateway boundary.
#[async_trait]
pub trait CommandProcessor: Send + Sync {
    async fn process(&self, request: &str, channel: &mut Channel) -> String;
}

/// Validates client tokens and binds the result onto the channel.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authorize(&self, channel: &mut Channel, token: &str) -> Result<(), AuthError>;
}

/// Decides whether a channel may read or write a given signal path.
#[async_trait]
pub trait AccessChecker: Send + Sync {
    async fn can_access(&self, channel: &Channel, path: &str, write: bool) -> bool;
}

/// Owns subscription state for connected clients.
///
/// The gateway only needs the teardown half: when a connection closes or
/// errors out, every subscription held by its identifier must be dropped
/// before the identifier becomes eligible for reuse. Delivery policy lives
/// entirely behind this trait.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    async fn remove_all(&self, connection: ConnectionId);
}

/// The signal-tree backing store consulted by the command processor.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Load the store from its configuration file. Called exactly once,
    /// before the gateway starts accepting connections.
    async fn initialize(&self, config_path: &str) -> Result<(), StoreError>;
}
