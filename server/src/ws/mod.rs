pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod registry;

use axum::extract::ws::Message;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

pub use actor::{ChatGateway, ConnectionState, LiveConnection};
pub use broadcast::{BroadcastRelay, Payload, RelayOutcome, RelayPolicy};
pub use registry::ConnectionRegistry;

/// Type alias for the sender half of a WebSocket connection's outbound queue.
/// The writer task owns the receiving half and forwards into the socket sink.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Process-unique identity of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next id. Ids are never reused within a process.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle to one live bidirectional channel.
///
/// Cloning is cheap: clones share the same outbound queue. A connection is
/// open for as long as its writer task still holds the receiving half.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: ConnectionSender,
}

impl Connection {
    pub fn new(sender: ConnectionSender) -> Self {
        Self {
            id: ConnectionId::next(),
            sender,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a frame for this connection. Fails only if the writer is gone.
    pub fn send(&self, msg: Message) -> Result<(), mpsc::error::SendError<Message>> {
        self.sender.send(msg)
    }
}
