use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors raised by the SQLite-backed user and message store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("email already registered")]
    EmailTaken,

    #[error("user not found: {0}")]
    UserNotFound(String),
}

/// Error returned from HTTP handlers. Rendered as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => ApiError::BadRequest("User already exists".to_string()),
            StoreError::UserNotFound(_) => ApiError::NotFound("User not found".to_string()),
            other => {
                tracing::error!(error = %other, "Store operation failed");
                ApiError::Internal("Database error".to_string())
            }
        }
    }
}

/// Malformed bodies, missing fields and a wrong content type are all client
/// errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!(error = %err, "Blocking task failed");
        ApiError::Internal("Internal server error".to_string())
    }
}
