//! Connection registry: owned, synchronized membership for every live
//! client connection.
//!
//! Each connection registers one outbound queue; the writer task draining
//! that queue is what makes delivery FIFO per connection. No ordering is
//! promised across distinct connections. A failed send is logged and never
//! aborts delivery to the remaining connections.

use std::collections::HashMap;

use parking_lot::RwLock;
use ripple_wire::ServerFrame;
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

/// Opaque session handle for one accepted connection.
pub type ConnId = Uuid;

/// One registered connection: its resolved origin address (immutable for the
/// connection's lifetime) and the sending half of its outbound queue.
pub struct ConnectionHandle {
    pub id: ConnId,
    pub addr: String,
    tx: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(id: ConnId, addr: String, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { id, addr, tx }
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: ConnectionHandle) {
        self.connections.write().insert(handle.id, handle);
    }

    pub fn unregister(&self, id: &ConnId) {
        self.connections.write().remove(id);
    }

    /// Currently registered connection count.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Send `frame` to every registered connection, including the sender of
    /// whatever triggered it. Serializes once; iterates a snapshot so
    /// membership may change concurrently.
    pub fn broadcast(&self, frame: &ServerFrame) {
        let Some(text) = encode(frame) else { return };

        let targets: Vec<(ConnId, mpsc::UnboundedSender<String>)> = self
            .connections
            .read()
            .values()
            .map(|h| (h.id, h.tx.clone()))
            .collect();

        for (id, tx) in targets {
            if tx.send(text.clone()).is_err() {
                debug!("broadcast skipped closing connection {}", id);
            }
        }
    }

    /// Send `frame` to one connection only. Failure is logged and isolated.
    pub fn send_to(&self, id: &ConnId, frame: &ServerFrame) {
        let Some(text) = encode(frame) else { return };

        let tx = self.connections.read().get(id).map(|h| h.tx.clone());
        match tx {
            Some(tx) => {
                if tx.send(text).is_err() {
                    debug!("reply dropped, connection {} is closing", id);
                }
            }
            None => debug!("reply dropped, connection {} already gone", id),
        }
    }
}

fn encode(frame: &ServerFrame) -> Option<String> {
    match serde_json::to_string(frame) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("failed to encode outbound frame: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_conn(registry: &ConnectionRegistry, addr: &str) -> (ConnId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        registry.register(ConnectionHandle::new(id, addr.to_string(), tx));
        (id, rx)
    }

    fn pong(ts: i64) -> ServerFrame {
        ServerFrame::Pong { ts: Some(ts) }
    }

    #[test]
    fn broadcast_reaches_every_connection_once() {
        let registry = ConnectionRegistry::new();
        let (_c1, mut rx1) = register_conn(&registry, "10.0.0.1");
        let (_c2, mut rx2) = register_conn(&registry, "10.0.0.2");

        registry.broadcast(&pong(1));

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn dead_connection_does_not_abort_delivery() {
        let registry = ConnectionRegistry::new();
        let (_dead, dead_rx) = register_conn(&registry, "10.0.0.1");
        drop(dead_rx);
        let (_live, mut live_rx) = register_conn(&registry, "10.0.0.2");

        registry.broadcast(&pong(1));

        assert!(live_rx.try_recv().is_ok());
    }

    #[test]
    fn send_to_targets_one_connection() {
        let registry = ConnectionRegistry::new();
        let (c1, mut rx1) = register_conn(&registry, "10.0.0.1");
        let (_c2, mut rx2) = register_conn(&registry, "10.0.0.2");

        registry.send_to(&c1, &pong(1));

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn single_connection_sees_broadcasts_in_issue_order() {
        let registry = ConnectionRegistry::new();
        let (_c1, mut rx) = register_conn(&registry, "10.0.0.1");

        for ts in 1..=5 {
            registry.broadcast(&pong(ts));
        }

        let received: Vec<ServerFrame> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|text| serde_json::from_str(&text).unwrap())
            .collect();
        let expected: Vec<ServerFrame> = (1..=5).map(pong).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn unregister_removes_membership() {
        let registry = ConnectionRegistry::new();
        let (c1, mut rx) = register_conn(&registry, "10.0.0.1");
        assert_eq!(registry.len(), 1);

        registry.unregister(&c1);
        assert!(registry.is_empty());

        registry.broadcast(&pong(1));
        assert!(rx.try_recv().is_err());
    }
}
