//! The connection-multiplexing gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use vis_core::{Channel, CommandProcessor, ConnectionId, SignalStore, SubscriptionHandler};

use crate::config::GatewayConfig;
use crate::connections::ConnectionTable;
use crate::error::GatewayError;
use crate::tls;

/// WebSocket gateway multiplexing many clients onto shared services.
///
/// A server instance listens either encrypted or in plaintext for its
/// whole lifetime; the per-connection logic is one generic code path
/// shared between the two modes.
pub struct GatewayServer {
    config: GatewayConfig,
    store: Arc<dyn SignalStore>,
    shared: Arc<SessionShared>,
}

/// State shared by every connection task and the push API.
struct SessionShared {
    endpoint: String,
    table: ConnectionTable,
    processor: Arc<dyn CommandProcessor>,
    subscriptions: Arc<dyn SubscriptionHandler>,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        processor: Arc<dyn CommandProcessor>,
        subscriptions: Arc<dyn SubscriptionHandler>,
        store: Arc<dyn SignalStore>,
    ) -> Self {
        let shared = Arc::new(SessionShared {
            endpoint: config.endpoint.clone(),
            table: ConnectionTable::new(),
            processor,
            subscriptions,
        });
        Self {
            config,
            store,
            shared,
        }
    }

    /// Initialize the backing store, then bind the listener and begin
    /// accepting connections.
    ///
    /// The store load completes before the first client can be served.
    /// Returns the bound address (useful with port 0).
    pub async fn start(&self, store_config: &str) -> Result<SocketAddr, GatewayError> {
        self.store.initialize(store_config).await?;

        let acceptor = tls::build_acceptor(&self.config.tls)?;
        let listener = TcpListener::bind(("0.0.0.0", self.config.port)).await?;
        let addr = listener.local_addr()?;
        info!(
            %addr,
            endpoint = %self.config.endpoint,
            encrypted = acceptor.is_some(),
            "gateway listening"
        );

        let shared = self.shared.clone();
        tokio::spawn(accept_loop(listener, acceptor, shared));
        Ok(addr)
    }

    /// Deliver an out-of-band payload to the connection holding `id`.
    ///
    /// Fire-and-forget: if the identifier is no longer live the payload
    /// is dropped and `false` returned; no error reaches the pusher.
    pub fn send_to_connection(&self, id: ConnectionId, payload: impl Into<String>) -> bool {
        self.shared.table.send_to(id, payload.into())
    }

    /// Number of currently attached clients.
    pub fn active_connections(&self) -> usize {
        self.shared.table.active_count()
    }
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    shared: Arc<SessionShared>,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };
        let shared = shared.clone();
        match acceptor.clone() {
            Some(tls) => {
                tokio::spawn(async move {
                    match tls.accept(stream).await {
                        Ok(stream) => run_session(stream, peer, shared).await,
                        Err(e) => warn!(%peer, error = %e, "TLS handshake failed"),
                    }
                });
            }
            None => {
                tokio::spawn(run_session(stream, peer, shared));
            }
        }
    }
}

/// Drive one client connection from WebSocket handshake to slot release.
///
/// Lifecycle: handshake and path check (Opening), slot allocation and
/// channel binding (Open), read loop until close or error (Closing), then
/// slot release and subscription teardown (Closed). A closed record is
/// never revived; a reconnecting client gets a fresh one.
async fn run_session<S>(stream: S, peer: SocketAddr, shared: Arc<SessionShared>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let endpoint = shared.endpoint.clone();
    let check_path = move |request: &Request, response: Response| {
        let path = request.uri().path();
        if path == endpoint || path.strip_suffix('/') == Some(endpoint.as_str()) {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("unknown endpoint".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };
    let mut ws = match tokio_tungstenite::accept_hdr_async(stream, check_path).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(%peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let conn_id: ConnectionId = match shared.table.allocate(outbound_tx.clone()) {
        Ok(id) => id,
        Err(e) => {
            warn!(%peer, error = %e, "rejecting connection");
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::Again,
                    reason: "connection table full".into(),
                }))
                .await;
            return;
        }
    };
    info!(%peer, conn_id, "connection opened");

    let mut channel = Channel::new(conn_id);
    let (mut sink, mut source) = ws.split();

    // Single writer per connection: replies and pushes leave through one
    // FIFO queue, so a connection observes its replies in request order.
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        match source.next().await {
            Some(Ok(Message::Text(request))) => {
                let reply = shared.processor.process(&request, &mut channel).await;
                if outbound_tx.send(reply).is_err() {
                    break;
                }
            }
            Some(Ok(Message::Close(status))) => {
                debug!(conn_id, ?status, "close requested by peer");
                break;
            }
            // Ping/pong are answered at the protocol layer; binary frames
            // are not part of the protocol.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(conn_id, error = %e, "connection error");
                break;
            }
            None => break,
        }
    }

    shared.table.free(conn_id);
    shared.subscriptions.remove_all(conn_id).await;
    drop(outbound_tx);
    let _ = writer.await;
    info!(conn_id, "connection closed");
}
