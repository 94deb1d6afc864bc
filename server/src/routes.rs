use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::auth::account;
use crate::chat::messages;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let account_routes = Router::new()
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/logout", post(account::logout))
        .route("/me", get(account::me))
        .route("/get_user", get(account::get_user));

    let message_routes = Router::new()
        .route("/send-message", post(messages::send_message))
        .route("/get-messages", get(messages::get_messages))
        .route("/delete-messages", post(messages::delete_messages));

    // WebSocket endpoint (no auth)
    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    let misc_routes = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check));

    let mut router = Router::new()
        .merge(account_routes)
        .merge(message_routes)
        .merge(ws_routes)
        .merge(misc_routes);

    if let Some(cors) = cors_layer(state.allowed_origin.as_deref()) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// CORS for a single credentialed browser origin. Credentials rule out `*`,
/// so an unparsable origin disables CORS rather than widening it.
fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    match HeaderValue::from_str(origin) {
        Ok(value) => Some(
            CorsLayer::new()
                .allow_origin(value)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        ),
        Err(e) => {
            tracing::warn!(origin = %origin, error = %e, "Invalid CORS origin, CORS disabled");
            None
        }
    }
}

async fn index() -> &'static str {
    "Konnichiwa"
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
