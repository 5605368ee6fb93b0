//! Daemon configuration file format

use serde::Deserialize;
use vis_gateway::GatewayConfig;
use vis_obd::SerialConfig;

/// Top-level TOML configuration for the daemon.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Signal-tree backing store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the signal-tree JSON file loaded before traffic is accepted
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "config/signals.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Client authorization settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret clients present with `authorize <token>`
    #[serde(default = "default_token")]
    pub token: String,
}

fn default_token() -> String {
    "appstacle".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: default_token(),
        }
    }
}
