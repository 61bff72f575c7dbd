// src/main.rs

use std::{net::SocketAddr, sync::Arc, time::Duration};

use quiz_backend::{
    config::Config,
    mailer::{HttpMailer, LogMailer},
    oauth::GoogleOAuth,
    routes,
    state::{AppState, SharedMailer, SharedStore},
    store::{MemoryStore, PgStore},
    sweep::spawn_expiry_sweep,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env is read if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: SharedStore = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mailer: SharedMailer = match &config.mail {
        Some(mail) => Arc::new(HttpMailer::new(mail.clone())?),
        None => {
            tracing::warn!("Mail API not configured, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let google = match &config.google {
        Some(google) => Some(GoogleOAuth::new(google.clone())?),
        None => {
            tracing::info!("Google sign-in disabled");
            None
        }
    };

    let _sweep = spawn_expiry_sweep(
        store.clone(),
        Duration::from_secs(config.sweep_interval_seconds.max(1)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(store, config, mailer, google);

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}
