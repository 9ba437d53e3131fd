//! Registry of live WebSocket connections.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;
use seatcast_core::{ConnectionId, OutboundEvent};
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Live connections indexed by connection ID.
///
/// Owned by the transport. Mutation and enumeration go through one
/// `RwLock`, so a snapshot is always a consistent view.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a connection unless `limit` live connections already exist or
    /// the ID is taken. Returns whether it was inserted.
    pub fn try_add(&self, connection: Arc<ClientConnection>, limit: usize) -> bool {
        let mut conns = self.connections.write();
        if conns.len() >= limit {
            return false;
        }
        match conns.entry(connection.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let _ = slot.insert(connection);
                true
            }
        }
    }

    /// Remove a connection by ID, returning it if it was live.
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.write().remove(connection_id)
    }

    /// Look up a live connection.
    pub fn get(&self, connection_id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.read().get(connection_id).cloned()
    }

    /// All live connections (unordered).
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().values().cloned().collect()
    }

    /// Identity tags of all live connections; untagged connections are skipped.
    pub fn identities(&self) -> Vec<String> {
        self.connections
            .read()
            .values()
            .filter_map(|c| c.identity().map(str::to_owned))
            .collect()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether no connection is live.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Send an event to every live connection. Returns the delivered count.
    pub fn broadcast(&self, event: &OutboundEvent) -> usize {
        let conns = self.connections.read();
        fan_out(conns.values(), event)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize `event` once and queue it on every given connection.
///
/// Returns how many connections accepted the frame.
pub fn fan_out<'a, I>(connections: I, event: &OutboundEvent) -> usize
where
    I: IntoIterator<Item = &'a Arc<ClientConnection>>,
{
    let json = match event.to_json() {
        Ok(j) => Arc::new(j),
        Err(e) => {
            warn!(event_name = %event.event_type, error = %e, "failed to serialize event");
            return 0;
        }
    };
    let mut delivered = 0;
    for conn in connections {
        if conn.send(Arc::clone(&json)) {
            delivered += 1;
        } else {
            warn!(conn_id = %conn.id, event_name = %event.event_type, "failed to send event to client");
        }
    }
    debug!(event_name = %event.event_type, recipients = delivered, "fan-out complete");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn make_connection(
        id: &str,
        user: Option<&str>,
    ) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new(id.into(), tx);
        if let Some(u) = user {
            let _ = conn.attach_identity(u.into());
        }
        (Arc::new(conn), rx)
    }

    #[test]
    fn add_and_remove() {
        let reg = ConnectionRegistry::new();
        let (c1, _rx) = make_connection("c1", None);
        assert!(reg.try_add(c1, 10));
        assert_eq!(reg.len(), 1);
        assert!(reg.get(&"c1".into()).is_some());
        assert!(reg.remove(&"c1".into()).is_some());
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_nonexistent_is_none() {
        let reg = ConnectionRegistry::default();
        assert!(reg.remove(&"nope".into()).is_none());
    }

    #[test]
    fn limit_is_enforced() {
        let reg = ConnectionRegistry::new();
        let (c1, _rx1) = make_connection("c1", None);
        let (c2, _rx2) = make_connection("c2", None);
        assert!(reg.try_add(c1, 1));
        assert!(!reg.try_add(c2, 1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_id_rejected() {
        let reg = ConnectionRegistry::new();
        let (c1, _rx1) = make_connection("same", Some("a"));
        let (c2, _rx2) = make_connection("same", Some("b"));
        assert!(reg.try_add(c1, 10));
        assert!(!reg.try_add(c2, 10));
        assert_eq!(reg.identities(), vec!["a".to_string()]);
    }

    #[test]
    fn identities_skip_untagged() {
        let reg = ConnectionRegistry::new();
        let (c1, _rx1) = make_connection("c1", Some("u1"));
        let (c2, _rx2) = make_connection("c2", None);
        let (c3, _rx3) = make_connection("c3", Some("u3"));
        for c in [c1, c2, c3] {
            assert!(reg.try_add(c, 10));
        }
        let mut ids = reg.identities();
        ids.sort();
        assert_eq!(ids, vec!["u1".to_string(), "u3".to_string()]);
    }

    #[test]
    fn identities_of_empty_registry() {
        assert!(ConnectionRegistry::new().identities().is_empty());
    }

    #[test]
    fn broadcast_reaches_everyone() {
        let reg = ConnectionRegistry::new();
        let (c1, mut rx1) = make_connection("c1", None);
        let (c2, mut rx2) = make_connection("c2", Some("u2"));
        assert!(reg.try_add(c1, 10));
        assert!(reg.try_add(c2, 10));

        let delivered = reg.broadcast(&OutboundEvent::new("system.ready", json!({})));
        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn broadcast_to_empty_registry() {
        let reg = ConnectionRegistry::new();
        assert_eq!(reg.broadcast(&OutboundEvent::new("x", json!(null))), 0);
    }

    #[test]
    fn fan_out_skips_closed_connections() {
        let (c1, rx1) = make_connection("c1", None);
        let (c2, mut rx2) = make_connection("c2", None);
        drop(rx1);
        let conns = [c1.clone(), c2];
        let delivered = fan_out(&conns, &OutboundEvent::new("x", json!({"n": 1})));
        assert_eq!(delivered, 1);
        assert_eq!(c1.drop_count(), 1);
        let msg = rx2.try_recv().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["data"]["n"], 1);
    }

    #[test]
    fn snapshot_is_detached_from_registry() {
        let reg = ConnectionRegistry::new();
        let (c1, _rx1) = make_connection("c1", None);
        assert!(reg.try_add(c1, 10));
        let snap = reg.snapshot();
        let _ = reg.remove(&"c1".into());
        assert_eq!(snap.len(), 1);
        assert!(reg.is_empty());
    }
}
