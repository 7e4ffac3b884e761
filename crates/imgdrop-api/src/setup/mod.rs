//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;
pub mod worker;

use crate::state::AppState;
use anyhow::Result;
use imgdrop_core::Config;
use imgdrop_db::{ImageRepository, ImageStore};
use imgdrop_storage::Storage;
use imgdrop_worker::PollerHandle;
use std::sync::Arc;

/// Everything `main` needs to run the service.
pub struct App {
    pub state: Arc<AppState>,
    pub router: axum::Router,
    /// `None` when no usable bot token is configured.
    pub poller: Option<PollerHandle>,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<App> {
    crate::telemetry::init_telemetry(config.environment())?;

    tracing::info!(
        environment = %config.environment(),
        base_url = %config.base_url(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let store: Arc<dyn ImageStore> = Arc::new(ImageRepository::new(pool));

    let storage: Arc<dyn Storage> = storage::setup_storage(&config).await?;

    let poller = worker::start_polling(&config, storage.clone(), store.clone());

    let state = Arc::new(AppState::new(&config, store, storage, poller.is_some()));
    let router = routes::setup_routes(state.clone());

    Ok(App {
        state,
        router,
        poller,
    })
}
