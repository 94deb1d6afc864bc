//! Database row types. These correspond 1:1 to the SQLite schema in
//! migrations.rs, plus the joined `username` on messages.

use serde::{Deserialize, Serialize};

/// User record in the users table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: String,
}

/// A persisted chat message joined with its author's username.
/// Never mutated after insert; removed only by the purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub content: String,
    /// RFC 3339, UTC, millisecond precision
    pub created_at: String,
}
