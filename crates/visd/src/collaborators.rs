//! Demonstration collaborator wiring
//!
//! Minimal implementations of the collaborator seams so the bridge runs
//! end-to-end against a real adapter: a command processor that forwards
//! OBD command lines to the serial driver, a shared-secret authenticator,
//! a permissive access checker, an in-memory subscription ledger, and a
//! JSON signal-tree store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};
use vis_core::{
    AccessChecker, AuthError, Authenticator, Channel, CommandProcessor, ConnectionId, SignalStore,
    StoreError, SubscriptionHandler,
};
use vis_obd::{ElmChannel, ElmDriver};

/// Validates tokens against a single shared secret.
pub struct SharedSecretAuthenticator {
    token: String,
}

impl SharedSecretAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl Authenticator for SharedSecretAuthenticator {
    async fn authorize(&self, channel: &mut Channel, token: &str) -> Result<(), AuthError> {
        if token == self.token {
            channel.set_authorized(token);
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Grants reads to everyone and writes to authorized channels.
pub struct PermissiveAccessChecker;

#[async_trait]
impl AccessChecker for PermissiveAccessChecker {
    async fn can_access(&self, channel: &Channel, _path: &str, write: bool) -> bool {
        !write || channel.is_authorized()
    }
}

/// Per-connection subscription ledger.
///
/// Holds which signal paths each connection has subscribed to; delivery
/// policy is out of scope here. The gateway calls [`SubscriptionHandler::
/// remove_all`] when a connection goes away, which keeps a reused
/// identifier from inheriting a previous client's subscriptions.
#[derive(Default)]
pub struct InMemorySubscriptionHandler {
    subscriptions: Mutex<HashMap<ConnectionId, HashSet<String>>>,
}

impl InMemorySubscriptionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription; returns the connection's subscription count.
    pub fn subscribe(&self, connection: ConnectionId, path: &str) -> usize {
        let mut subscriptions = self.subscriptions.lock();
        let paths = subscriptions.entry(connection).or_default();
        paths.insert(path.to_string());
        paths.len()
    }

    pub fn subscription_count(&self, connection: ConnectionId) -> usize {
        self.subscriptions
            .lock()
            .get(&connection)
            .map_or(0, HashSet::len)
    }
}

#[async_trait]
impl SubscriptionHandler for InMemorySubscriptionHandler {
    async fn remove_all(&self, connection: ConnectionId) {
        if let Some(paths) = self.subscriptions.lock().remove(&connection) {
            info!(
                connection,
                dropped = paths.len(),
                "dropped subscriptions for closed connection"
            );
        }
    }
}

/// Signal-tree store backed by a JSON file.
#[derive(Default)]
pub struct JsonSignalStore {
    tree: RwLock<Option<serde_json::Value>>,
}

impl JsonSignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal_count(&self) -> usize {
        self.tree.read().as_ref().map_or(0, count_leaves)
    }
}

#[async_trait]
impl SignalStore for JsonSignalStore {
    async fn initialize(&self, config_path: &str) -> Result<(), StoreError> {
        let raw = tokio::fs::read_to_string(config_path)
            .await
            .map_err(|source| StoreError::Io {
                path: config_path.to_string(),
                source,
            })?;
        let tree: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| StoreError::Malformed {
                path: config_path.to_string(),
                reason: e.to_string(),
            })?;
        info!(
            path = %config_path,
            signals = count_leaves(&tree),
            "signal tree loaded"
        );
        *self.tree.write() = Some(tree);
        Ok(())
    }
}

fn count_leaves(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Object(map) => map.values().map(count_leaves).sum(),
        serde_json::Value::Array(items) => items.iter().map(count_leaves).sum(),
        _ => 1,
    }
}

/// Forwards client command lines to the adapter.
///
/// Understands three request forms ahead of the raw passthrough:
/// `authorize <token>`, `subscribe <path>`, and `dtc`. Anything else is
/// access-checked, terminated with a carriage return, and exchanged with
/// the adapter as an AT/OBD command line. Failures are encoded in the
/// reply text; nothing is raised across the gateway boundary.
pub struct ObdCommandProcessor<C: ElmChannel> {
    driver: Arc<ElmDriver<C>>,
    authenticator: Arc<dyn Authenticator>,
    access: Arc<dyn AccessChecker>,
    subscriptions: Arc<InMemorySubscriptionHandler>,
}

impl<C: ElmChannel> ObdCommandProcessor<C> {
    pub fn new(
        driver: Arc<ElmDriver<C>>,
        authenticator: Arc<dyn Authenticator>,
        access: Arc<dyn AccessChecker>,
        subscriptions: Arc<InMemorySubscriptionHandler>,
    ) -> Self {
        Self {
            driver,
            authenticator,
            access,
            subscriptions,
        }
    }
}

#[async_trait]
impl<C: ElmChannel + 'static> CommandProcessor for ObdCommandProcessor<C> {
    async fn process(&self, request: &str, channel: &mut Channel) -> String {
        let request = request.trim();

        if let Some(token) = request.strip_prefix("authorize ") {
            return match self.authenticator.authorize(channel, token.trim()).await {
                Ok(()) => "authorized".to_string(),
                Err(e) => format!("error: {e}"),
            };
        }

        if let Some(path) = request.strip_prefix("subscribe ") {
            let path = path.trim();
            if !self.access.can_access(channel, path, false).await {
                return "error: access denied".to_string();
            }
            let total = self.subscriptions.subscribe(channel.connection_id(), path);
            return format!("subscribed: {path} ({total} active)");
        }

        if request.eq_ignore_ascii_case("dtc") {
            return match self.driver.read_diagnostic_codes().await {
                Ok(reply) => reply,
                Err(e) => format!("error: {e}"),
            };
        }

        if request.is_empty() {
            return "error: empty request".to_string();
        }
        if !self.access.can_access(channel, request, false).await {
            return "error: access denied".to_string();
        }

        let mut command = request.as_bytes().to_vec();
        command.push(b'\r');
        match self.driver.send_query(&command).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "adapter query failed");
                format!("error: {e}")
            }
        }
    }
}
