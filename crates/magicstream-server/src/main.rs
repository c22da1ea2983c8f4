//! MagicStream Server: Application entry point.

use anyhow::Context;
use magicstream_auth::SessionLifecycleService;
use magicstream_db::repository::{SurrealSessionStore, SurrealUserRepository};
use magicstream_db::{DbManager, run_migrations};
use magicstream_server::{AppConfig, AppState, router};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("magicstream=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting MagicStream server...");

    let config = AppConfig::load().context("failed to load configuration")?;
    let auth_config = config
        .auth
        .to_auth_config()
        .context("invalid auth configuration")?;
    let origins = config
        .server
        .cors_origins()
        .context("invalid server.allowed_origins entry")?;

    let db = DbManager::connect(&config.database.to_db_config())
        .await
        .context("failed to connect to SurrealDB")?;
    run_migrations(db.client())
        .await
        .context("failed to apply migrations")?;

    let service = SessionLifecycleService::new(
        SurrealUserRepository::new(db.client().clone()),
        SurrealSessionStore::new(db.client().clone()),
        auth_config,
    )?;
    let app = router(AppState::new(service, &config.server), origins);

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;
    tracing::info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("MagicStream server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
