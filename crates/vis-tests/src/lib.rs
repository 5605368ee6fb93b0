//! Integration-test support for the VIS bridge
//!
//! Collaborator doubles shared by the end-to-end tests:
//!
//! - `gateway_e2e_test.rs` - gateway behavior over real WebSocket clients
//! - `bridge_e2e_test.rs` - full path from WebSocket client to a scripted
//!   adapter behind the serial driver

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::DuplexStream;
use vis_core::{
    Channel, CommandProcessor, ConnectionId, SignalStore, StoreError, SubscriptionHandler,
};
use vis_obd::ElmDriver;

/// Replies with the request prefixed by the connection identifier, so
/// tests can learn a connection's identifier from any reply.
pub struct EchoProcessor;

#[async_trait]
impl CommandProcessor for EchoProcessor {
    async fn process(&self, request: &str, channel: &mut Channel) -> String {
        format!("{}:{}", channel.connection_id(), request)
    }
}

/// Sends each request line to the adapter with a carriage return appended.
pub struct PassthroughProcessor {
    driver: Arc<ElmDriver<DuplexStream>>,
}

impl PassthroughProcessor {
    pub fn new(driver: Arc<ElmDriver<DuplexStream>>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl CommandProcessor for PassthroughProcessor {
    async fn process(&self, request: &str, _channel: &mut Channel) -> String {
        let mut command = request.trim().as_bytes().to_vec();
        command.push(b'\r');
        match self.driver.send_query(&command).await {
            Ok(reply) => reply,
            Err(e) => format!("error: {e}"),
        }
    }
}

/// Records which connections had their subscriptions torn down.
#[derive(Default)]
pub struct RecordingSubscriptions {
    removed: Mutex<Vec<ConnectionId>>,
}

impl RecordingSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removed(&self) -> Vec<ConnectionId> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl SubscriptionHandler for RecordingSubscriptions {
    async fn remove_all(&self, connection: ConnectionId) {
        self.removed.lock().push(connection);
    }
}

/// Store that only remembers whether it was initialized.
#[derive(Default)]
pub struct NullStore {
    initialized: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalStore for NullStore {
    async fn initialize(&self, _config_path: &str) -> Result<(), StoreError> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }
}
