//! Gateway configuration

use serde::{Deserialize, Serialize};

/// Configuration for the gateway listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// TCP port to listen on; 0 binds an ephemeral port
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL path clients must request during the WebSocket handshake
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// TLS settings; when disabled the listener is plaintext
    #[serde(default)]
    pub tls: TlsConfig,
}

fn default_port() -> u16 {
    8090
}

fn default_endpoint() -> String {
    "/vis".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            endpoint: default_endpoint(),
            tls: TlsConfig::default(),
        }
    }
}

/// TLS listener settings. A server instance is either encrypted or
/// plaintext for its whole lifetime; there is no runtime switch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// PEM certificate chain path
    #[serde(default)]
    pub cert_path: String,
    /// PEM private key path
    #[serde(default)]
    pub key_path: String,
}
