use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{
    BroadcastRelay, Connection, ConnectionId, ConnectionRegistry, ConnectionSender, Payload,
    RelayOutcome, RelayPolicy,
};

/// How long the writer gets to flush the closing handshake before it is aborted.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of one connection as seen by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// A connection together with its lifecycle state. Owned by the task that
/// serves the socket; the registry only holds the `Connection` half.
#[derive(Debug)]
pub struct LiveConnection {
    conn: Connection,
    state: ConnectionState,
}

impl LiveConnection {
    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Orchestrates accept → relay → close for every WebSocket client.
///
/// Owns its registry, so independent gateways never see each other's
/// connections. Cloning shares the same registry.
#[derive(Debug, Clone)]
pub struct ChatGateway {
    registry: Arc<ConnectionRegistry>,
    relay: BroadcastRelay,
}

impl ChatGateway {
    pub fn new(policy: RelayPolicy) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = BroadcastRelay::new(registry.clone(), policy);
        Self { registry, relay }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn policy(&self) -> RelayPolicy {
        self.relay.policy()
    }

    /// Accept a new connection whose frames are written through `sender`.
    /// The connection is registered and becomes a broadcast target.
    pub fn accept(&self, sender: ConnectionSender) -> LiveConnection {
        let mut live = LiveConnection {
            conn: Connection::new(sender),
            state: ConnectionState::Connecting,
        };
        self.registry.register(live.conn.clone());
        live.state = ConnectionState::Open;

        tracing::debug!(
            connection = %live.id(),
            connections = self.registry.len(),
            "Connection registered"
        );
        live
    }

    /// Handle one inbound payload. The gateway neither parses nor persists it.
    /// Returns `None` if the connection is no longer open.
    pub fn on_payload(&self, live: &LiveConnection, payload: Payload) -> Option<RelayOutcome> {
        if live.state != ConnectionState::Open {
            tracing::debug!(connection = %live.id(), "Payload after close ignored");
            return None;
        }
        Some(self.relay.relay(live.id(), &payload))
    }

    /// Close and deregister. Safe to call any number of times.
    pub fn close(&self, live: &mut LiveConnection) {
        if live.state == ConnectionState::Closed {
            return;
        }
        live.state = ConnectionState::Closed;
        self.registry.deregister(live.id());

        tracing::debug!(
            connection = %live.id(),
            connections = self.registry.len(),
            "Connection unregistered"
        );
    }

    /// Run the actor-per-connection pattern for one upgraded WebSocket.
    ///
    /// Splits the socket into a writer task that drains the outbound queue
    /// into the sink, and a reader loop that relays every text/binary frame.
    /// There is no idle or pong timeout: a peer that vanishes without a close
    /// frame stays registered until the transport reports an error.
    pub async fn serve(self, socket: WebSocket) {
        let (ws_sender, mut ws_receiver) = socket.split();
        let (tx, rx) = mpsc::unbounded_channel::<Message>();

        let mut live = self.accept(tx);
        tracing::info!(connection = %live.id(), "WebSocket client connected");

        let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx));

        loop {
            match ws_receiver.next().await {
                Some(Ok(msg)) => match msg {
                    Message::Text(_) | Message::Binary(_) => {
                        if let Some(payload) = Payload::from_message(msg) {
                            self.on_payload(&live, payload);
                        }
                    }
                    Message::Ping(data) => {
                        let _ = live.connection().send(Message::Pong(data));
                    }
                    Message::Pong(_) => {}
                    Message::Close(frame) => {
                        tracing::info!(
                            connection = %live.id(),
                            reason = ?frame,
                            "Client initiated close"
                        );
                        break;
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(
                        connection = %live.id(),
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
                None => {
                    tracing::info!(connection = %live.id(), "WebSocket stream ended");
                    break;
                }
            }
        }

        // Answers a client close, or starts one ourselves after an error
        let _ = live.connection().send(Message::Close(None));
        self.close(&mut live);
        let id = live.id();
        drop(live);

        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut writer_handle)
            .await
            .is_err()
        {
            tracing::debug!(connection = %id, "Writer did not finish closing, aborting");
            writer_handle.abort();
        }

        tracing::info!(connection = %id, "WebSocket client disconnected");
    }
}

/// Writer task: receives frames from the outbound queue and forwards them to the sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if ws_sender.send(msg).await.is_err() || closing {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_accept_registers_and_opens() {
        let gateway = ChatGateway::new(RelayPolicy::IncludeSender);
        let (tx, _rx) = mpsc::unbounded_channel();

        let live = gateway.accept(tx);

        assert_eq!(live.state(), ConnectionState::Open);
        assert!(gateway.registry().contains(live.id()));
    }

    #[test]
    fn test_three_clients_hello_in_registry_order() {
        let gateway = ChatGateway::new(RelayPolicy::IncludeSender);
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        let a = gateway.accept(tx_a);
        let b = gateway.accept(tx_b);
        let c = gateway.accept(tx_c);

        let order: Vec<_> = gateway.registry().all().iter().map(|c| c.id()).collect();
        assert_eq!(order, vec![a.id(), b.id(), c.id()]);

        let outcome = gateway.on_payload(&a, Payload::text("hello")).unwrap();

        assert_eq!(outcome.delivered, 3);
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            assert_eq!(drain(rx), vec![Message::Text("hello".into())]);
        }
    }

    #[test]
    fn test_departed_client_gets_nothing() {
        let gateway = ChatGateway::new(RelayPolicy::IncludeSender);
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let mut a = gateway.accept(tx_a);
        let b = gateway.accept(tx_b);

        gateway.close(&mut a);
        gateway.on_payload(&b, Payload::text("x"));

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(drain(&mut rx_b), vec![Message::Text("x".into())]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let gateway = ChatGateway::new(RelayPolicy::IncludeSender);
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let mut a = gateway.accept(tx_a);
        let b = gateway.accept(tx_b);

        gateway.close(&mut a);
        gateway.close(&mut a);

        assert_eq!(a.state(), ConnectionState::Closed);
        assert_eq!(gateway.registry().len(), 1);
        assert!(gateway.registry().contains(b.id()));
    }

    #[test]
    fn test_payload_after_close_is_ignored() {
        let gateway = ChatGateway::new(RelayPolicy::IncludeSender);
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let mut a = gateway.accept(tx_a);
        let _b = gateway.accept(tx_b);

        gateway.close(&mut a);

        assert!(gateway.on_payload(&a, Payload::text("late")).is_none());
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_gateways_are_independent() {
        let first = ChatGateway::new(RelayPolicy::IncludeSender);
        let second = ChatGateway::new(RelayPolicy::IncludeSender);
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = first.accept(tx_a);
        let _b = second.accept(tx_b);

        first.on_payload(&a, Payload::text("only first"));

        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(first.registry().len(), 1);
        assert_eq!(second.registry().len(), 1);
    }

    #[test]
    fn test_clone_shares_registry() {
        let gateway = ChatGateway::new(RelayPolicy::ExcludeSender);
        let clone = gateway.clone();
        let (tx, _rx) = mpsc::unbounded_channel();

        let live = clone.accept(tx);

        assert!(gateway.registry().contains(live.id()));
        assert_eq!(gateway.policy(), RelayPolicy::ExcludeSender);
    }
}
