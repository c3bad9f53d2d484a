//! Connection pool (C6): `connection_id -> sink`, with serialized
//! per-connection delivery.
//!
//! Each `Connection` owns one `mpsc::Sender<String>` feeding the
//! connection's single writer task (`connection.rs`), so two distinct
//! fanout dispatches to the same connection can never interleave their
//! bytes — the channel itself is the serialization point, matching the
//! teacher's `tx_internal`/`send_task` pair in the original monolith.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::warn;

/// A live connection's server-generated id and serialized sink.
#[derive(Clone)]
pub struct Connection {
    id: String,
    sink: mpsc::Sender<String>,
}

impl Connection {
    pub fn new(id: String, sink: mpsc::Sender<String>) -> Self {
        Connection { id, sink }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Enqueues `frame` on this connection's serialized writer. A full or
    /// closed channel is treated as a delivery failure for this
    /// connection only; the caller logs and moves on (§4.6: "a send
    /// failure on one connection does not abort delivery to the
    /// others").
    pub fn send(&self, frame: String) -> bool {
        self.sink.try_send(frame).is_ok()
    }
}

#[derive(Default)]
pub struct ConnectionPool {
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, conn: Connection) {
        self.connections.write().insert(conn.id().to_string(), conn);
    }

    pub fn remove(&self, conn_id: &str) {
        self.connections.write().remove(conn_id);
    }

    pub fn get(&self, conn_id: &str) -> Option<Connection> {
        self.connections.read().get(conn_id).cloned()
    }

    pub fn size(&self) -> usize {
        self.connections.read().len()
    }

    /// Sends `frame` to `conn_id` if it is still present. Returns false
    /// if the connection is gone or its channel is full/closed.
    pub fn send_to(&self, conn_id: &str, frame: String) -> bool {
        match self.get(conn_id) {
            Some(conn) => {
                let ok = conn.send(frame);
                if !ok {
                    warn!(connection_id = conn_id, "failed to deliver frame; connection will be torn down by its own read loop");
                }
                ok
            }
            None => false,
        }
    }

    /// Sends the same `frame` to every connection in `ids` that is still
    /// present. Snapshots sinks under the shared lock, then sends outside
    /// it so a slow recipient cannot block registration.
    pub fn broadcast(&self, ids: &[String], frame: &str) {
        let snapshot: Vec<Connection> = {
            let map = self.connections.read();
            ids.iter().filter_map(|id| map.get(id).cloned()).collect()
        };
        for conn in snapshot {
            if !conn.send(frame.to_string()) {
                warn!(connection_id = conn.id(), "broadcast delivery failed");
            }
        }
    }
}
