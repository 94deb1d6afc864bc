use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Connection, ConnectionId};

#[derive(Debug)]
struct Registered {
    /// Registration sequence, used to hand out snapshots in insertion order.
    seq: u64,
    conn: Connection,
}

/// Set of currently open WebSocket connections.
///
/// Every operation is a short synchronous critical section on one DashMap
/// shard; nothing is awaited while a shard guard is held. Register and
/// deregister are idempotent.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Registered>,
    next_seq: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. No-op if a connection with the same id is present.
    pub fn register(&self, conn: Connection) {
        match self.connections.entry(conn.id()) {
            Entry::Occupied(_) => {
                tracing::debug!(connection = %conn.id(), "Connection already registered");
            }
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Registered { seq, conn });
            }
        }
    }

    /// Remove a connection. No-op if absent.
    pub fn deregister(&self, id: ConnectionId) {
        if self.connections.remove(&id).is_none() {
            tracing::trace!(connection = %id, "Deregister of unknown connection ignored");
        }
    }

    /// Snapshot of all registered connections in registration order.
    ///
    /// The snapshot is detached from the registry: connections registered or
    /// removed afterwards do not affect it.
    pub fn all(&self) -> Vec<Connection> {
        let mut entries: Vec<(u64, Connection)> = self
            .connections
            .iter()
            .map(|entry| (entry.seq, entry.conn.clone()))
            .collect();
        entries.sort_unstable_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, conn)| conn).collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
