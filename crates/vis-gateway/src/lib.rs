//! vis-gateway - connection-multiplexing WebSocket gateway
//!
//! Accepts client connections over exactly one transport mode (encrypted
//! or plaintext, fixed at construction), assigns each a stable identifier
//! from a fixed-capacity table, routes inbound text to the injected
//! command processor, and exposes an addressed fire-and-forget push API
//! for asynchronous producers such as subscription delivery.

pub mod config;
pub mod connections;
pub mod error;
pub mod server;
mod tls;

pub use config::{GatewayConfig, TlsConfig};
pub use connections::{ConnectionTable, CLIENT_MASK, MAX_CLIENTS};
pub use error::GatewayError;
pub use server::GatewayServer;
