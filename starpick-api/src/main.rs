//! Starpick API Server
//!
//! Binary entry point: loads configuration from the environment, connects
//! to PostgreSQL, and serves the REST API until SIGINT.

use starpick_api::{auth::AuthConfig, create_api_router, email, ApiConfig, DbClient, DbConfig};
use starpick_storage::AppStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let auth = Arc::new(AuthConfig::from_env());
    auth.validate_for_production()?;
    let config = Arc::new(ApiConfig::from_env());

    let db_config = DbConfig::from_env();
    tracing::info!(
        host = %db_config.host,
        port = db_config.port,
        dbname = %db_config.dbname,
        "Connecting to PostgreSQL"
    );
    let db = DbClient::from_config(&db_config)?;
    db.ping().await?;
    db.ensure_schema().await?;
    let store: Arc<dyn AppStore> = Arc::new(db);

    let mailer = email::mailer_from_env();
    let app = create_api_router(store, mailer, config, auth);

    let addr = resolve_bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Starpick API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,starpick_api=debug"));

    let json_logs = std::env::var("STARPICK_LOG_JSON")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Bind address from `STARPICK_API_BIND`, or `0.0.0.0:{STARPICK_API_PORT}`.
fn resolve_bind_addr() -> String {
    if let Ok(bind) = std::env::var("STARPICK_API_BIND") {
        return bind;
    }
    let port = std::env::var("STARPICK_API_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);
    format!("0.0.0.0:{port}")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {}", e);
        return;
    }
    tracing::info!("SIGINT received, shutting down");
}
