use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::error::TransportError;
use crate::types::Update;

/// Chunks of a remote file as they arrive.
pub type FileStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A resolved remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Path relative to the file download endpoint.
    pub path: String,
    pub size: Option<u64>,
}

/// Remote operations the bot needs from the messaging platform.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Long-poll for updates with `update_id >= offset`, waiting up to
    /// `timeout_secs` server-side. An empty vector means nothing arrived.
    async fn fetch_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError>;

    /// Resolve an opaque file id to a downloadable path.
    async fn fetch_file_descriptor(&self, file_id: &str)
        -> Result<FileDescriptor, TransportError>;

    /// Start downloading a resolved file.
    async fn download_file(&self, path: &str) -> Result<FileStream, TransportError>;

    /// Best effort: failures are logged, never returned.
    async fn send_reply(&self, chat_id: i64, text: &str);

    /// Remove any configured webhook so long polling is allowed.
    async fn delete_webhook(&self) -> Result<(), TransportError>;
}
