//! Serial driver configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the serial connection to the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial device path (e.g. "/dev/ttyAMA0")
    pub device: String,
    /// Baud rate; ELM327-class adapters ship at 38400
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Inter-byte read timeout in milliseconds
    #[serde(default = "default_byte_timeout_ms")]
    pub byte_timeout_ms: u64,
    /// Settle delay after the adapter reset command, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_baud_rate() -> u32 {
    38400
}

fn default_byte_timeout_ms() -> u64 {
    10_000
}

fn default_settle_delay_ms() -> u64 {
    200
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: default_baud_rate(),
            byte_timeout_ms: default_byte_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl SerialConfig {
    /// Budget granted to each single-byte read of a reply.
    pub fn byte_timeout(&self) -> Duration {
        Duration::from_millis(self.byte_timeout_ms)
    }

    /// Pause between the reset command and the protocol handshake.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
