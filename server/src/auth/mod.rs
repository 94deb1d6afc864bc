//! Account management and cookie sessions.
//!
//! Sessions are the two cookies set at login (`user_id`, `username`); there is
//! no server-side session table. WebSocket connections are not authenticated.

pub mod account;
pub mod middleware;
pub mod password;
pub mod users;
