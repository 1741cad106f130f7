use axum::http::{Method, header};
use devcollab::{AppState, config::Config, create_router};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Attende Ctrl+C per lo shutdown graceful
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT, shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {:?}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devcollab=info,tower_http=info".into()),
        )
        .init();

    // Carica la configurazione (legge anche il file .env)
    let config = Config::from_env()?;
    config.print_info();

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    let state = Arc::new(AppState::with_presence_ttl(
        pool,
        config.jwt_secret.clone(),
        config.presence_ttl_secs,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::AUTHORIZATION]);

    let app = create_router(state).layer(cors);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
