//! Message persistence. This is the only write path into `messages`; it is
//! independent of the WebSocket relay and never triggers a broadcast.

use chrono::{SecondsFormat, Utc};
use rusqlite::OptionalExtension;

use crate::db::models::Message;
use crate::db::DbPool;
use crate::error::StoreError;

/// Persist a message authored by `user_id` and return it with its
/// assigned id, author username and creation timestamp.
pub fn append_message(db: &DbPool, user_id: &str, content: &str) -> Result<Message, StoreError> {
    let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;

    let username: String = conn
        .query_row(
            "SELECT username FROM users WHERE id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;

    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    conn.execute(
        "INSERT INTO messages (user_id, content, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, content, created_at],
    )?;

    Ok(Message {
        id: conn.last_insert_rowid(),
        user_id: user_id.to_string(),
        username,
        content: content.to_string(),
        created_at,
    })
}

/// All messages, oldest first. Returns an empty list right after a purge.
pub fn list_messages(db: &DbPool) -> Result<Vec<Message>, StoreError> {
    let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;

    let mut stmt = conn.prepare(
        "SELECT m.id, m.user_id, u.username, m.content, m.created_at
         FROM messages m
         JOIN users u ON u.id = m.user_id
         ORDER BY m.created_at ASC, m.id ASC",
    )?;

    let messages = stmt
        .query_map([], |row| {
            Ok(Message {
                id: row.get(0)?,
                user_id: row.get(1)?,
                username: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(messages)
}

/// Delete every message. Returns the number of rows removed.
pub fn delete_all_messages(db: &DbPool) -> Result<usize, StoreError> {
    let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
    Ok(conn.execute("DELETE FROM messages", [])?)
}
