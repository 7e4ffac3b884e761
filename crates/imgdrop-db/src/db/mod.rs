//! Metadata store for uploaded images
//!
//! The ingestion pipeline only needs insert and lookup by filename, so the
//! store is a small trait with a PostgreSQL implementation for production
//! and an in-memory one for tests and local runs without a database.

pub mod image;
pub mod memory;

pub use image::ImageRepository;
pub use memory::InMemoryImageStore;

use async_trait::async_trait;
use imgdrop_core::{ImageRecord, NewImageRecord, PersistenceError};

/// Insert-and-lookup access to image metadata.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Insert one record atomically. A filename that is already taken fails
    /// with [`PersistenceError::DuplicateFilename`].
    async fn insert(&self, record: NewImageRecord) -> Result<ImageRecord, PersistenceError>;

    async fn get_by_filename(&self, filename: &str)
        -> Result<Option<ImageRecord>, PersistenceError>;

    async fn count(&self) -> Result<i64, PersistenceError>;
}
