use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use barberbook::config::AppConfig;
use barberbook::db;
use barberbook::db::queries;
use barberbook::routes;
use barberbook::services::auth;
use barberbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.session_secret == "changeme" {
        tracing::warn!("SESSION_SECRET is not set; using an insecure default");
    }

    let conn = db::init_db(&config.database_url)?;

    if let Some(email) = &config.bootstrap_admin_email {
        auth::bootstrap_admin(&conn, email)?;
    }

    let state = Arc::new(AppState::new(conn, config.clone()));

    // Sweep expired sessions hourly
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                let result = state.db().map_err(anyhow::Error::from).and_then(|db| {
                    queries::expire_old_sessions(&db)
                });
                match result {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "expired sessions removed"),
                    Err(e) => tracing::error!(error = %e, "session cleanup failed"),
                }
            }
        });
    }

    let cors = match &config.cors_allow_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new(),
    };

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
