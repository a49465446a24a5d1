pub mod api; // Site API: sitemap, robots, chat widget, registration, dashboard
pub mod bookings;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod gateway;
pub mod models;
pub mod registration;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{ApiContext, ServerError};
use crate::config::{AppConfig, ConfigError};
use crate::gateway::GatewayError;
use crate::storage::{FileBackend, LocalStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Open the file store under the configured data directory, or an in-memory
/// store when the directory cannot be used. The root store is unbounded; each
/// visitor's scope carries `storage_quota_bytes`.
fn open_store(config: &AppConfig) -> LocalStore {
    let backend = FileBackend::new(config.storage_dir.clone(), None);
    let store = LocalStore::new(Arc::new(backend));
    if store.is_available() {
        tracing::info!(dir = %config.storage_dir.display(), "Using file storage");
        store
    } else {
        tracing::warn!(
            dir = %config.storage_dir.display(),
            "Storage directory unavailable, falling back to memory"
        );
        LocalStore::memory()
    }
}

/// Run the site server until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    if config.chat_webhook_url.is_none() {
        tracing::warn!("No chat webhook configured, replies will use fallback text");
    }

    let bind_addr = config.bind_addr;
    let store = open_store(&config);
    let ctx = ApiContext::new(config, store)?;
    let mut server = api::start_site_server(ctx, bind_addr).await?;

    tokio::signal::ctrl_c().await.map_err(StartupError::Signal)?;
    server.shutdown();
    server.stopped().await;
    Ok(())
}
