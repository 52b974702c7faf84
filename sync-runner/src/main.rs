use anyhow::{Context, Result};
use extsync::config::load_or_default;
use extsync::settings::{self, SqliteSettingsStore};
use sync_runner::api::{create_router, ApiState};
use sync_runner::AdapterRegistry;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("EXTSYNC_CONFIG").unwrap_or_else(|_| "extsync.toml".to_string());
    let config = load_or_default(&config_path)?;

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .init();

    info!("Sync runner starting...");

    let encryption_key = std::env::var("EXTSYNC_ENCRYPTION_KEY")
        .context("EXTSYNC_ENCRYPTION_KEY is required (base64-encoded 32-byte key)")?;

    info!(
        config = %config_path,
        settings_db = %config.store.path,
        api_port = config.api.port,
        error_scope = ?config.runner.error_scope,
        "Configuration loaded"
    );

    // Initialize settings store and write any missing seeds
    let store = Arc::new(
        SqliteSettingsStore::new(&config.store.path, &encryption_key)
            .context("Failed to initialize settings store")?,
    );
    let seeded = settings::seed(
        store.as_ref(),
        config
            .adapters
            .iter()
            .map(|(project, seed)| (project.as_str(), seed.to_record())),
    )
    .context("Failed to seed adapter settings")?;
    info!(seeded = seeded, "Settings store initialized");

    let registry = Arc::new(AdapterRegistry::from_config(store, &config));
    info!(projects = ?registry.projects(), "Adapter registry ready");

    // Start HTTP API server
    let router = create_router(ApiState::new(registry));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.api.port))
        .await
        .context("Failed to bind runner API port")?;
    info!(port = config.api.port, "Runner API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Runner API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("Sync runner stopped");

    Ok(())
}
