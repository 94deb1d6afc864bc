use crate::auth::middleware::CookieSettings;
use crate::db::DbPool;
use crate::ws::ChatGateway;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// WebSocket gateway; owns the live connection registry
    pub gateway: ChatGateway,
    /// Attributes for the session cookies issued at login
    pub cookies: CookieSettings,
    /// Origin allowed to make credentialed cross-origin requests
    pub allowed_origin: Option<String>,
}
