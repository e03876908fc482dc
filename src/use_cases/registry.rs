// Registry of live client connections, owned exclusively by the engine task.

use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Process-unique identifier for one live connection.
pub type ConnectionId = u64;

/// Outbound queue handle for one connection. The socket task drains the
/// other end, so fan-out never waits on a slow client.
pub type ConnectionSender = mpsc::UnboundedSender<Utf8Bytes>;

/// Tracks the set of currently live client handles. No business logic.
///
/// Not thread-safe on its own: it is mutated and iterated only from the
/// engine task, whose single-writer discipline stands in for locks.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    pub fn add(&mut self, conn_id: ConnectionId, handle: ConnectionSender) {
        self.connections.insert(conn_id, handle);
    }

    /// Drops the handle, which closes the connection's outbound queue.
    pub fn remove(&mut self, conn_id: ConnectionId) {
        self.connections.remove(&conn_id);
    }

    /// Unicast to a single connection. Returns false when the connection is
    /// unknown or its socket task has already gone away.
    pub fn send_to(&self, conn_id: ConnectionId, bytes: Utf8Bytes) -> bool {
        match self.connections.get(&conn_id) {
            Some(handle) => handle.send(bytes).is_ok(),
            None => false,
        }
    }

    /// Sends the same bytes to every registered connection. A failed send
    /// to one handle never aborts delivery to the rest. Returns how many
    /// connections accepted the payload.
    pub fn broadcast(&self, bytes: &Utf8Bytes) -> usize {
        let mut delivered = 0;
        for (conn_id, handle) in &self.connections {
            if handle.send(bytes.clone()).is_ok() {
                delivered += 1;
            } else {
                // The socket task unregisters itself through its own
                // read-failure path; here we only skip the dead handle.
                debug!(conn_id, "skipping closed connection during fan-out");
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Utf8Bytes {
        Utf8Bytes::from("{\"message_type\":\"ticket_list\",\"tickets\":[]}")
    }

    #[test]
    fn broadcast_reaches_every_connection() {
        let mut registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.add(1, tx_a);
        registry.add(2, tx_b);

        assert_eq!(registry.broadcast(&payload()), 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn broadcast_survives_a_dead_handle() {
        let mut registry = ConnectionRegistry::new();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        registry.add(1, tx_dead);
        registry.add(2, tx_live);

        // Simulate a connection whose socket task is gone.
        drop(rx_dead);

        assert_eq!(registry.broadcast(&payload()), 1);
        assert!(rx_live.try_recv().is_ok());
    }

    #[test]
    fn removed_connections_no_longer_receive() {
        let mut registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add(1, tx);
        registry.remove(1);

        assert!(registry.is_empty());
        assert_eq!(registry.broadcast(&payload()), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_to_unknown_connection_is_false() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to(7, payload()));
    }
}
