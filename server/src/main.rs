use std::net::SocketAddr;
use tokio::net::TcpListener;

use chat_server::config::{generate_config_template, Config};
use chat_server::{chat, db, routes, state, ws};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chat_server=info"));
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(env_filter)
            .init();
    }

    tracing::info!("Chat server v{} starting", env!("CARGO_PKG_VERSION"));

    let db = db::init_db(&config.data_dir)?;

    let purge = config.purge_config();
    if purge.enabled {
        chat::purge::spawn_message_purge(db.clone(), purge.hour_utc);
        tracing::info!("Daily message purge enabled at {:02}:00 UTC", purge.hour_utc);
    } else {
        tracing::info!("Message purge disabled");
    }

    let gateway = ws::ChatGateway::new(config.relay_policy());
    tracing::info!(policy = ?gateway.policy(), "WebSocket relay ready");

    let app_state = state::AppState {
        db,
        gateway,
        cookies: config.cookie_settings(),
        allowed_origin: Some(config.allowed_origin.clone()),
    };

    let app = routes::build_router(app_state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
