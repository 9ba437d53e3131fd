//! The real-time connection layer attached to the HTTP server.
//!
//! A [`Transport`] owns the [`ConnectionRegistry`] and the `/ws` upgrade
//! route. It does not know about delivery strategies: every accepted or
//! closed connection is reported as a [`TransportEvent`] on a single-consumer
//! channel, and whoever built the transport (the dispatch context) decides
//! what to do with it.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use seatcast_core::{ConnectionId, OutboundEvent};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use super::registry::ConnectionRegistry;
use super::session::run_ws_session;
use crate::config::ServerConfig;

/// Path of the WebSocket upgrade route.
pub const WS_PATH: &str = "/ws";

/// Connection-layer limits, derived from [`ServerConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum live connections; upgrades beyond this get `503`.
    pub max_connections: usize,
    /// Outbound queue capacity per connection.
    pub send_queue_capacity: usize,
    /// Interval between Ping frames.
    pub heartbeat_interval: Duration,
    /// Silence after which a client is dropped.
    pub heartbeat_timeout: Duration,
    /// Max inbound message size in bytes.
    pub max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for TransportConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            send_queue_capacity: config.send_queue_capacity.max(1),
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs.max(1)),
            heartbeat_timeout: Duration::from_secs(config.heartbeat_timeout_secs.max(1)),
            max_message_size: config.max_message_size,
        }
    }
}

/// What a client supplied when opening the connection (`/ws?userId=...`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Optional identity tag.
    pub user_id: Option<String>,
}

impl Handshake {
    /// Handshake carrying an identity tag.
    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// The identity tag, ignoring empty values.
    pub fn identity(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Connection lifecycle notifications emitted by the transport.
pub enum TransportEvent {
    /// A client finished its upgrade and is in the registry, with its
    /// handshake identity (if any) already attached.
    Connected {
        /// The new connection.
        connection: Arc<ClientConnection>,
    },
    /// A client left and was removed from the registry.
    Disconnected {
        /// ID of the departed connection.
        connection_id: ConnectionId,
    },
}

/// Something a [`Transport`] can be mounted on (the HTTP server).
pub trait TransportHost {
    /// Limits for the connection layer.
    fn transport_config(&self) -> TransportConfig;
    /// Token cancelled when the host shuts down.
    fn shutdown_token(&self) -> CancellationToken;
    /// Take ownership of the transport's routes.
    fn attach_transport(&self, transport: Arc<Transport>);
}

/// The connection layer: registry, upgrade route, lifecycle channel.
pub struct Transport {
    config: TransportConfig,
    registry: Arc<ConnectionRegistry>,
    events: mpsc::UnboundedSender<TransportEvent>,
    shutdown: CancellationToken,
}

impl Transport {
    /// Create a transport that reports lifecycle events on `events`.
    pub fn new(
        config: TransportConfig,
        shutdown: CancellationToken,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(ConnectionRegistry::new()),
            events,
            shutdown,
        }
    }

    /// Connection-layer limits.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Live connections.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Token cancelled on server shutdown.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Whether the connection limit is reached.
    pub fn at_capacity(&self) -> bool {
        self.registry.len() >= self.config.max_connections
    }

    /// Admit a new client: create its connection, attach the handshake
    /// identity, add it to the registry and report
    /// [`TransportEvent::Connected`].
    ///
    /// The connection is never visible in the registry without its identity.
    /// Returns the connection and the receiving end of its outbound queue,
    /// or `None` when the connection limit is reached.
    pub fn accept(
        &self,
        handshake: Handshake,
    ) -> Option<(Arc<ClientConnection>, mpsc::Receiver<Arc<String>>)> {
        let (tx, rx) = mpsc::channel(self.config.send_queue_capacity);
        let connection = Arc::new(ClientConnection::new(ConnectionId::new(), tx));
        if let Some(user_id) = handshake.identity() {
            let _ = connection.attach_identity(user_id.to_owned());
        }
        if !self
            .registry
            .try_add(connection.clone(), self.config.max_connections)
        {
            warn!(max = self.config.max_connections, "connection limit reached, rejecting client");
            return None;
        }
        debug!(conn_id = %connection.id, "connection accepted");
        let event = TransportEvent::Connected {
            connection: connection.clone(),
        };
        if self.events.send(event).is_err() {
            warn!(conn_id = %connection.id, "no lifecycle listener, client will not be registered");
            connection.mark_registered();
        }
        Some((connection, rx))
    }

    /// Remove a client and report [`TransportEvent::Disconnected`].
    ///
    /// Closing an unknown or already-closed connection does nothing.
    pub fn close(&self, connection_id: &ConnectionId) {
        if self.registry.remove(connection_id).is_none() {
            return;
        }
        let event = TransportEvent::Disconnected {
            connection_id: connection_id.clone(),
        };
        if self.events.send(event).is_err() {
            warn!(conn_id = %connection_id, "no lifecycle listener for disconnect");
        }
    }

    /// Send an event to every live connection. Returns the delivered count.
    pub fn broadcast(&self, event_name: &str, data: Value) -> usize {
        self.registry.broadcast(&OutboundEvent::new(event_name, data))
    }

    /// Routes served by this transport (`GET /ws`).
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route(WS_PATH, get(ws_upgrade))
            .with_state(Arc::clone(self))
    }
}

/// GET /ws: upgrade to a WebSocket session.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(handshake): Query<Handshake>,
    State(transport): State<Arc<Transport>>,
) -> Response {
    if transport.at_capacity() {
        warn!("connection limit reached, refusing upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }
    ws.max_message_size(transport.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let Some((connection, outbound)) = transport.accept(handshake) else {
                return;
            };
            run_ws_session(socket, transport, connection, outbound).await;
        })
}
