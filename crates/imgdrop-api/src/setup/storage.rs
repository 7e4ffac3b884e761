//! Upload directory setup

use anyhow::{Context, Result};
use imgdrop_core::Config;
use imgdrop_storage::LocalStorage;
use std::sync::Arc;

/// Create the upload directory if needed and wrap it in [`LocalStorage`].
pub async fn setup_storage(config: &Config) -> Result<Arc<LocalStorage>> {
    let storage = LocalStorage::new(config.upload_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to prepare upload directory {}",
                config.upload_dir().display()
            )
        })?;

    tracing::info!(
        upload_dir = %storage.base_path().display(),
        max_upload_mb = config.max_upload_size_bytes() / 1024 / 1024,
        "Local storage initialized"
    );

    Ok(Arc::new(storage))
}
