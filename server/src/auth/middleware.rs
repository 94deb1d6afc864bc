use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::convert::Infallible;

use crate::db::models::User;
use crate::error::ApiError;

pub const USER_ID_COOKIE: &str = "user_id";
pub const USERNAME_COOKIE: &str = "username";

/// Attributes applied to the session cookies issued at login.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Send with `Secure`. Browsers only honour `SameSite=None` on secure cookies.
    pub secure: bool,
    pub max_age_hours: i64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true,
            max_age_hours: 24,
        }
    }
}

impl CookieSettings {
    fn build(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::None)
            .max_age(time::Duration::hours(self.max_age_hours))
            .build()
    }

    /// Add the `user_id` and `username` session cookies for `user`.
    pub fn issue(&self, jar: CookieJar, user: &User) -> CookieJar {
        jar.add(self.build(USER_ID_COOKIE, user.id.clone()))
            .add(self.build(USERNAME_COOKIE, user.username.clone()))
    }
}

/// Remove both session cookies.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(USER_ID_COOKIE).path("/"))
        .remove(Cookie::build(USERNAME_COOKIE).path("/"))
}

/// The user a request's session cookies resolve to.
/// Use as an extractor to require a session; `Option<SessionUser>` makes it optional.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub username: Option<String>,
}

impl SessionUser {
    pub fn from_jar(jar: &CookieJar) -> Option<Self> {
        let user_id = jar
            .get(USER_ID_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|id| !id.is_empty())?;
        let username = jar.get(USERNAME_COOKIE).map(|c| c.value().to_string());
        Some(Self { user_id, username })
    }
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        SessionUser::from_jar(&jar).ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))
    }
}

impl<S> OptionalFromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(SessionUser::from_jar(&jar))
    }
}
