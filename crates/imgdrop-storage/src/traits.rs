//! Storage abstraction trait

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;

/// Boxed error carried by incoming byte streams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Incoming byte stream handed to [`Storage::stage_stream`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid filename: {0}")]
    InvalidKey(String),

    #[error("File not found: {0}")]
    NotFound(String),

    /// The target name is already taken on disk. Nothing was overwritten.
    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("File exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// The source stream failed before it was fully received.
    #[error("Incoming stream failed: {0}")]
    Stream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A fully received file that is not yet visible under a public name.
#[derive(Debug)]
pub struct StagedFile {
    pub(crate) path: PathBuf,
    pub(crate) size_bytes: u64,
}

impl StagedFile {
    /// Location of the staged bytes, for validation before promotion.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Flat, filename-addressed file storage.
///
/// The ingestion side writes through `stage_stream` then `promote`; the web
/// surface only reads with `exists` and `download_stream`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Receive a stream into a staging file reserved for `filename`.
    ///
    /// Fails with [`StorageError::TooLarge`] as soon as more than `max_bytes`
    /// arrive; the staging file is removed on every failure.
    async fn stage_stream(
        &self,
        filename: &str,
        stream: ByteStream,
        max_bytes: u64,
    ) -> StorageResult<StagedFile>;

    /// Atomically publish a staged file under `filename` and return the
    /// on-disk size measured afterwards.
    ///
    /// Fails with [`StorageError::AlreadyExists`] instead of replacing an
    /// existing file; the staged bytes are then kept for another attempt.
    async fn promote(&self, staged: &StagedFile, filename: &str) -> StorageResult<u64>;

    /// Drop a staged file that will never be promoted.
    async fn discard(&self, staged: StagedFile) -> StorageResult<()>;

    /// Rename a stored file. Never replaces an existing `to`.
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Delete a stored file. Deleting a missing file is not an error.
    async fn delete(&self, filename: &str) -> StorageResult<()>;

    async fn exists(&self, filename: &str) -> StorageResult<bool>;

    /// Size in bytes of a stored file.
    async fn content_length(&self, filename: &str) -> StorageResult<u64>;

    /// Read a stored file as a stream of chunks.
    async fn download_stream(
        &self,
        filename: &str,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>>;
}
