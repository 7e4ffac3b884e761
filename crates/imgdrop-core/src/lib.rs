//! imgdrop core library
//!
//! Domain models, error types and configuration shared by every imgdrop
//! component: the Telegram ingestion worker, the storage and database layers,
//! and the web surface that serves stored images.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{resolve_base_url, Config, ImageHostConfig};
pub use error::{AppError, ErrorMetadata, LogLevel, PersistenceError};
pub use models::{ImageMime, ImageRecord, NewImageRecord};
