//! REST endpoints for sending, listing and deleting chat messages.

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::SessionUser;
use crate::chat::store;
use crate::db::models::Message;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Maximum message content length (chars).
const MAX_CONTENT_LENGTH: usize = 4000;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    /// Author when the request carries no session cookie.
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct DeleteMessagesResponse {
    pub message: String,
    pub deleted: usize,
}

// --- Handlers ---

/// POST /send-message
/// Persist a message and return it. Does not broadcast: clients push the
/// returned message over their WebSocket to deliver it in real time.
pub async fn send_message(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    WithRejection(Json(body), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> ApiResult<Json<SendMessageResponse>> {
    let user_id = session
        .map(|s| s.user_id)
        .or(body.user_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

    // Stored exactly as sent; whitespace only counts against emptiness
    let content = body.content;
    if content.trim().is_empty() {
        return Err(ApiError::BadRequest("Message content is required".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Message exceeds {} characters",
            MAX_CONTENT_LENGTH
        )));
    }

    let db = state.db.clone();
    let message =
        tokio::task::spawn_blocking(move || store::append_message(&db, &user_id, &content))
            .await??;

    tracing::debug!(
        message_id = message.id,
        user_id = %message.user_id,
        "Message stored"
    );

    Ok(Json(SendMessageResponse { message }))
}

/// GET /get-messages
/// Full history, oldest first.
pub async fn get_messages(State(state): State<AppState>) -> ApiResult<Json<MessagesResponse>> {
    let db = state.db.clone();
    let messages = tokio::task::spawn_blocking(move || store::list_messages(&db)).await??;
    Ok(Json(MessagesResponse { messages }))
}

/// POST /delete-messages
/// Remove every message. Also what the scheduled purge does.
pub async fn delete_messages(
    State(state): State<AppState>,
) -> ApiResult<Json<DeleteMessagesResponse>> {
    let db = state.db.clone();
    let deleted = tokio::task::spawn_blocking(move || store::delete_all_messages(&db)).await??;

    tracing::info!(deleted, "All messages deleted");

    Ok(Json(DeleteMessagesResponse {
        message: "All messages deleted".to_string(),
        deleted,
    }))
}
