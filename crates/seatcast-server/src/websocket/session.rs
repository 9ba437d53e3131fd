//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::transport::Transport;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// First event every client receives.
pub const CONNECTION_ESTABLISHED_EVENT: &str = "connection.established";

/// Run a WebSocket session for an accepted client.
///
/// 1. Waits for the delivery strategy to register the connection, then
///    sends a `connection.established` event with the connection ID
/// 2. Forwards queued outbound frames to the socket
/// 3. Sends periodic Ping frames and drops unresponsive clients
/// 4. Ignores inbound application frames (clients only listen)
/// 5. Closes the connection on the transport when anything ends the session
#[instrument(skip_all, fields(conn_id = %connection.id))]
pub async fn run_ws_session(
    ws: WebSocket,
    transport: Arc<Transport>,
    connection: Arc<ClientConnection>,
    mut send_rx: mpsc::Receiver<Arc<String>>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let started = Instant::now();

    info!("client connected");
    ::metrics::counter!(WS_CONNECTIONS_TOTAL).increment(1);
    ::metrics::gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let heartbeat_interval = transport.config().heartbeat_interval;
    let heartbeat_timeout = transport.config().heartbeat_timeout;
    if tokio::time::timeout(heartbeat_timeout, connection.registered())
        .await
        .is_err()
    {
        warn!("strategy did not register client in time, continuing");
    }

    let _ = connection.emit(
        CONNECTION_ESTABLISHED_EVENT,
        json!({ "clientId": connection.id }),
    );

    let shutdown = transport.shutdown_token().clone();
    let outbound_conn = connection.clone();
    let mut outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > heartbeat_timeout
                    {
                        warn!(timeout = ?heartbeat_timeout, "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = shutdown.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                let Some(Ok(msg)) = frame else { break };
                match msg {
                    Message::Close(_) => {
                        debug!("client sent close frame");
                        break;
                    }
                    Message::Ping(_) | Message::Pong(_) => connection.mark_alive(),
                    Message::Text(_) | Message::Binary(_) => {
                        connection.mark_alive();
                        debug!("ignoring inbound application frame");
                    }
                }
            }
            _ = &mut outbound => break,
        }
    }

    outbound.abort();
    transport.close(&connection.id);
    info!(
        duration_secs = started.elapsed().as_secs_f64(),
        dropped = connection.drop_count(),
        "client disconnected"
    );
    ::metrics::counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    ::metrics::gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::transport::{Handshake, TransportConfig};
    use serde_json::Value;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn established_event_shape() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let transport = Transport::new(
            TransportConfig::default(),
            CancellationToken::new(),
            events_tx,
        );
        let (conn, mut rx) = transport.accept(Handshake::default()).unwrap();
        assert!(conn.emit(CONNECTION_ESTABLISHED_EVENT, json!({ "clientId": conn.id })));

        let msg = rx.recv().await.unwrap();
        let parsed: Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "connection.established");
        assert_eq!(parsed["data"]["clientId"], conn.id.as_str());
        assert!(parsed["timestamp"].is_string());
    }
}
