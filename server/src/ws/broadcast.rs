use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes};
use std::sync::Arc;

use super::{ConnectionId, ConnectionRegistry};

/// Opaque unit relayed between connections. Re-sent verbatim, same frame type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(Utf8Bytes),
    Binary(Bytes),
}

impl Payload {
    pub fn text(text: impl Into<Utf8Bytes>) -> Self {
        Payload::Text(text.into())
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Payload::Binary(data.into())
    }

    /// Extract a relayable payload from an inbound frame.
    /// Control frames (ping/pong/close) are not payloads.
    pub fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(text) => Some(Payload::Text(text)),
            Message::Binary(data) => Some(Payload::Binary(data)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Payload> for Message {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(data) => Message::Binary(data),
        }
    }
}

/// Which registered connections a relay targets.
///
/// `IncludeSender` echoes the payload back to the connection that sent it;
/// existing web clients render their own messages from that echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayPolicy {
    #[default]
    IncludeSender,
    ExcludeSender,
}

/// Per-relay delivery counts. `delivered + skipped + failed` equals the
/// number of targets in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayOutcome {
    pub delivered: usize,
    /// Target was no longer open when its turn came.
    pub skipped: usize,
    /// Target looked open but the send was rejected.
    pub failed: usize,
}

impl RelayOutcome {
    pub fn attempted(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }
}

/// Fans one payload out to every connection in the registry.
#[derive(Debug, Clone)]
pub struct BroadcastRelay {
    registry: Arc<ConnectionRegistry>,
    policy: RelayPolicy,
}

impl BroadcastRelay {
    pub fn new(registry: Arc<ConnectionRegistry>, policy: RelayPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> RelayPolicy {
        self.policy
    }

    /// Deliver `payload` to the registry snapshot taken at call time.
    ///
    /// Best effort: a closed or failing target is counted and skipped, never
    /// removed from here, and never stops delivery to the targets after it.
    pub fn relay(&self, sender: ConnectionId, payload: &Payload) -> RelayOutcome {
        let mut outcome = RelayOutcome::default();

        for target in self.registry.all() {
            if self.policy == RelayPolicy::ExcludeSender && target.id() == sender {
                continue;
            }

            if !target.is_open() {
                tracing::debug!(
                    sender = %sender,
                    target = %target.id(),
                    "Skipping relay to closed connection"
                );
                outcome.skipped += 1;
                continue;
            }

            match target.send(Message::from(payload.clone())) {
                Ok(()) => outcome.delivered += 1,
                Err(_) => {
                    tracing::warn!(
                        sender = %sender,
                        target = %target.id(),
                        "Relay send failed, continuing with remaining connections"
                    );
                    outcome.failed += 1;
                }
            }
        }

        tracing::debug!(
            sender = %sender,
            bytes = payload.len(),
            delivered = outcome.delivered,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Payload relayed"
        );

        outcome
    }
}
