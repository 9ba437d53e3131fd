//! Broadcast strategy: every event goes to every live connection.

use std::sync::Arc;

use seatcast_core::{ConnectionId, OutboundEvent};
use serde_json::Value;
use tracing::debug;

use crate::dispatch::DeliveryStrategy;
use crate::websocket::{ClientConnection, Transport};

/// Delivers through the transport's registry, so it keeps no state of its
/// own. Course updates arrive as the generic `course_updated` event.
pub struct BroadcastStrategy {
    transport: Arc<Transport>,
}

impl BroadcastStrategy {
    /// Catalog key.
    pub const KEY: &'static str = "broadcast";

    /// Strategy delivering through `transport`.
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }
}

impl DeliveryStrategy for BroadcastStrategy {
    fn name(&self) -> &str {
        Self::KEY
    }

    fn register_client(&self, connection: Arc<ClientConnection>) {
        debug!(conn_id = %connection.id, "broadcast: client available");
    }

    fn unregister_client(&self, connection_id: &ConnectionId) {
        debug!(conn_id = %connection_id, "broadcast: client gone");
    }

    fn distribute_message(&self, event_name: &str, data: &Value) {
        let delivered = self
            .transport
            .registry()
            .broadcast(&OutboundEvent::new(event_name, data.clone()));
        debug!(event_name, delivered, "broadcast: delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::{Handshake, TransportConfig};
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn make_transport() -> Arc<Transport> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Arc::new(Transport::new(
            TransportConfig::default(),
            CancellationToken::new(),
            tx,
        ))
    }

    #[tokio::test]
    async fn reaches_every_connection() {
        let transport = make_transport();
        let strategy = BroadcastStrategy::new(Arc::clone(&transport));
        let (_c1, mut rx1) = transport.accept(Handshake::with_user("u1")).unwrap();
        let (_c2, mut rx2) = transport.accept(Handshake::default()).unwrap();

        strategy.distribute_message("course_updated", &json!({"seatsAvailable": 2}));

        for rx in [&mut rx1, &mut rx2] {
            let msg = rx.recv().await.unwrap();
            let parsed: Value = serde_json::from_str(&msg).unwrap();
            assert_eq!(parsed["type"], "course_updated");
            assert_eq!(parsed["data"]["seatsAvailable"], 2);
        }
    }

    #[tokio::test]
    async fn closed_connection_receives_nothing() {
        let transport = make_transport();
        let strategy = BroadcastStrategy::new(Arc::clone(&transport));
        let (gone, mut gone_rx) = transport.accept(Handshake::default()).unwrap();
        let (_stay, mut stay_rx) = transport.accept(Handshake::default()).unwrap();

        transport.close(&gone.id);
        strategy.unregister_client(&gone.id);
        strategy.distribute_message("announcement", &json!({}));

        assert!(stay_rx.try_recv().is_ok());
        assert!(gone_rx.try_recv().is_err());
    }

    #[test]
    fn name_is_catalog_key() {
        assert_eq!(BroadcastStrategy::new(make_transport()).name(), "broadcast");
    }
}
