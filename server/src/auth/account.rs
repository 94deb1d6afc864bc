//! REST endpoints for registration, login and the cookie session.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::{clear_session, SessionUser};
use crate::auth::{password, users};
use crate::db::models::User;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}

// --- Handlers ---

/// POST /register
/// Create an account. The password is bcrypt-hashed before storage.
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<AccountResponse>)> {
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_string();
    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username, email and password are required".to_string(),
        ));
    }

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        if users::find_user_by_email(&db, &email)?.is_some() {
            return Err(crate::error::StoreError::EmailTaken);
        }
        let hash = password::hash_password(&body.password)?;
        users::insert_user(&db, &username, &email, &hash)
    })
    .await??;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User created".to_string(),
            user,
        }),
    ))
}

/// POST /login
/// Verify credentials and set the `user_id` and `username` session cookies.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<(CookieJar, Json<AccountResponse>)> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let db = state.db.clone();
    let email = body.email.trim().to_string();
    let user = tokio::task::spawn_blocking(move || {
        let user = users::find_user_by_email(&db, &email)?;
        Ok::<_, crate::error::StoreError>(
            user.filter(|u| password::verify_password(&body.password, &u.password_hash)),
        )
    })
    .await??
    .ok_or_else(invalid)?;

    tracing::info!(user_id = %user.id, "User logged in");

    let jar = state.cookies.issue(jar, &user);
    Ok((
        jar,
        Json(AccountResponse {
            message: "Login successful".to_string(),
            user,
        }),
    ))
}

/// POST /logout
/// Clear the session cookies. Succeeds whether or not a session exists.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<StatusMessage>) {
    (
        clear_session(jar),
        Json(StatusMessage {
            message: "Logged out".to_string(),
        }),
    )
}

/// GET /me
/// Return the id of the user the session cookie belongs to.
pub async fn me(session: SessionUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: session.user_id,
    })
}

/// GET /get_user
/// Return the profile of the session user.
pub async fn get_user(
    State(state): State<AppState>,
    session: SessionUser,
) -> ApiResult<Json<UserProfileResponse>> {
    let db = state.db.clone();
    let user_id = session.user_id.clone();
    let user = tokio::task::spawn_blocking(move || users::find_user_by_id(&db, &user_id))
        .await??
        .ok_or_else(|| {
            ApiError::Internal("Failed to load user information".to_string())
        })?;

    Ok(Json(UserProfileResponse {
        user_id: user.id,
        username: user.username,
        email: user.email,
    }))
}
