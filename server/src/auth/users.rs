//! User persistence.

use chrono::{SecondsFormat, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::models::User;
use crate::db::DbPool;
use crate::error::StoreError;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Insert a new user with an already-hashed password.
/// Fails with `EmailTaken` if the email is registered.
pub fn insert_user(
    db: &DbPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, StoreError> {
    let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;

    let exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        rusqlite::params![email],
        |row| row.get::<_, i64>(0).map(|c| c > 0),
    )?;
    if exists {
        return Err(StoreError::EmailTaken);
    }

    let user = User {
        id: Uuid::now_v7().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            user.id,
            user.username,
            user.email,
            user.password_hash,
            user.created_at
        ],
    )?;

    Ok(user)
}

pub fn find_user_by_email(db: &DbPool, email: &str) -> Result<Option<User>, StoreError> {
    let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_user_by_id(db: &DbPool, id: &str) -> Result<Option<User>, StoreError> {
    let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}
