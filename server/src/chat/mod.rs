//! Persisted chat messages: storage, REST endpoints and the scheduled purge.
//!
//! Nothing in this module touches the WebSocket relay. A message stored via
//! `POST /send-message` reaches live clients only if a client pushes it over
//! its own socket.

pub mod messages;
pub mod purge;
pub mod store;
