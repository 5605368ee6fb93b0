//! visd - VIS bridge daemon
//!
//! Bridges a single ELM327-class OBD-II adapter to concurrent WebSocket
//! clients through a request/response and push-notification gateway.
//!
//! Usage:
//!   visd [config.toml]
//!
//! Without a config file the daemon uses defaults: plaintext listener on
//! port 8090, endpoint /vis, adapter on /dev/ttyUSB0.

mod collaborators;
mod config;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collaborators::{
    InMemorySubscriptionHandler, JsonSignalStore, ObdCommandProcessor, PermissiveAccessChecker,
    SharedSecretAuthenticator,
};
use config::DaemonConfig;
use vis_gateway::GatewayServer;
use vis_obd::ElmDriver;

/// Budget for the adapter reset and protocol-negotiation handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Parsed command-line arguments
struct Args {
    /// Daemon config file (TOML)
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let mut result = Args { config_path: None };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other if !other.starts_with('-') => {
                result.config_path = Some(other.to_string());
            }
            _ => {
                tracing::warn!("Unknown argument: {}", arg);
            }
        }
    }

    result
}

fn print_help() {
    eprintln!(
        r#"visd - VIS bridge daemon

Usage: visd [config.toml]

Options:
  -h, --help    Print this help message

Examples:
  # Run with defaults (plaintext listener on 8090, adapter on /dev/ttyUSB0)
  visd

  # Run with a config file
  visd config/visd.toml
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visd=info,vis_gateway=info,vis_obd=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting visd (VIS bridge daemon)");

    let args = parse_args();
    let config = match &args.config_path {
        Some(path) => {
            tracing::info!("Loading config from: {}", path);
            let raw = std::fs::read_to_string(path)?;
            toml::from_str::<DaemonConfig>(&raw)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            DaemonConfig::default()
        }
    };

    // The driver serves whoever the processor routes to it; a missing
    // adapter leaves the gateway up with queries answered by error text.
    let driver = Arc::new(ElmDriver::new(config.serial.clone()));
    if let Err(e) = driver.connect(CONNECT_TIMEOUT).await {
        tracing::warn!(error = %e, "adapter connection failed, continuing without vehicle data");
    }

    let authenticator = Arc::new(SharedSecretAuthenticator::new(config.auth.token.clone()));
    let subscriptions = Arc::new(InMemorySubscriptionHandler::new());
    let store = Arc::new(JsonSignalStore::new());
    let processor = Arc::new(ObdCommandProcessor::new(
        driver.clone(),
        authenticator,
        Arc::new(PermissiveAccessChecker),
        subscriptions.clone(),
    ));

    let server = GatewayServer::new(
        config.gateway.clone(),
        processor,
        subscriptions,
        store,
    );
    let addr = server.start(&config.store.path).await?;
    tracing::info!("Serving {} on {}", config.gateway.endpoint, addr);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    if driver.is_connected().await {
        let _ = driver.disconnect().await;
    }

    Ok(())
}
