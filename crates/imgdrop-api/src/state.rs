//! Shared state for the web surface.

use imgdrop_core::Config;
use imgdrop_db::ImageStore;
use imgdrop_storage::Storage;
use std::sync::Arc;

/// Read side of the image host: the metadata store and the upload directory.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ImageStore>,
    pub storage: Arc<dyn Storage>,
    /// Public base used for links shown on HTML pages.
    pub base_url: String,
    pub max_upload_size_bytes: u64,
    /// Whether the Telegram polling loop was started.
    pub polling_enabled: bool,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn ImageStore>,
        storage: Arc<dyn Storage>,
        polling_enabled: bool,
    ) -> Self {
        Self {
            store,
            storage,
            base_url: config.base_url().to_string(),
            max_upload_size_bytes: config.max_upload_size_bytes(),
            polling_enabled,
        }
    }
}
