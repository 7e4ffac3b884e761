//! Ingestion of one photo or document: resolve, download, validate, store,
//! commit and reply.

use chrono::Utc;
use futures::TryStreamExt;
use imgdrop_core::{Config, ImageRecord, NewImageRecord, PersistenceError};
use imgdrop_db::ImageStore;
use imgdrop_processing::{FilenameAllocator, MediaValidator, ValidationError};
use imgdrop_storage::{BoxError, ByteStream, StagedFile, Storage, StorageError};
use imgdrop_telegram::{BotApi, TransportError};
use std::sync::Arc;

use crate::replies::Reply;

/// Column width of `original_filename`.
const MAX_ORIGINAL_NAME_CHARS: usize = 255;

/// Who sent the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    pub id: String,
    pub username: Option<String>,
}

/// Document payload with the metadata its sender declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEvent {
    pub file_id: String,
    pub declared_name: Option<String>,
    pub declared_mime: Option<String>,
    pub declared_size: Option<u64>,
}

/// Media the pipeline can ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Photo { file_id: String },
    Document(DocumentEvent),
}

impl MediaSource {
    pub fn file_id(&self) -> &str {
        match self {
            MediaSource::Photo { file_id } => file_id,
            MediaSource::Document(doc) => &doc.file_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MediaSource::Photo { .. } => "photo",
            MediaSource::Document(_) => "document",
        }
    }

    /// Photos have no name of their own, so one is made from the file id.
    fn original_name(&self) -> String {
        let name = match self {
            MediaSource::Photo { file_id } => format!("telegram_photo_{}", file_id),
            MediaSource::Document(doc) => doc
                .declared_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("telegram_document_{}", doc.file_id)),
        };
        name.chars().take(MAX_ORIGINAL_NAME_CHARS).collect()
    }
}

/// Why one event failed. Each variant maps to exactly one [`Reply`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("file rejected: {0}")]
    Rejected(#[from] ValidationError),

    #[error("could not resolve file: {0}")]
    Resolve(#[source] TransportError),

    #[error("download failed: {0}")]
    Download(String),

    #[error("file exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("storage failure: {0}")]
    Storage(#[source] StorageError),

    #[error("metadata commit failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { limit } => IngestError::TooLarge { limit },
            StorageError::Stream(msg) => IngestError::Download(msg),
            other => IngestError::Storage(other),
        }
    }
}

impl IngestError {
    pub fn reply(&self, max_upload_bytes: u64) -> Reply {
        let max_mb = max_upload_bytes / (1024 * 1024);
        match self {
            IngestError::Rejected(ValidationError::NotAnImage(_)) => Reply::NotAnImage,
            IngestError::Rejected(ValidationError::UnsupportedFormat(_)) => {
                Reply::UnsupportedFormat
            }
            IngestError::Rejected(ValidationError::FileTooLarge { .. })
            | IngestError::TooLarge { .. } => Reply::TooLarge { max_mb },
            IngestError::Rejected(ValidationError::Corrupt(_))
            | IngestError::Rejected(ValidationError::EmptyFile) => Reply::Corrupt,
            IngestError::Resolve(_) | IngestError::Download(_) => Reply::DownloadFailed,
            IngestError::Storage(_) | IngestError::Persistence(_) => Reply::Failed,
        }
    }

    /// Rejections are the sender's doing; everything else is ours.
    fn is_rejection(&self) -> bool {
        matches!(
            self,
            IngestError::Rejected(_) | IngestError::TooLarge { .. }
        )
    }
}

/// Orchestrates one media event end to end.
pub struct IngestionPipeline {
    bot: Arc<dyn BotApi>,
    storage: Arc<dyn Storage>,
    store: Arc<dyn ImageStore>,
    validator: MediaValidator,
    allocator: FilenameAllocator,
    base_url: String,
}

impl IngestionPipeline {
    pub fn new(
        bot: Arc<dyn BotApi>,
        storage: Arc<dyn Storage>,
        store: Arc<dyn ImageStore>,
        base_url: impl Into<String>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            bot,
            storage,
            store,
            validator: MediaValidator::new(max_upload_bytes),
            allocator: FilenameAllocator::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(
        config: &Config,
        bot: Arc<dyn BotApi>,
        storage: Arc<dyn Storage>,
        store: Arc<dyn ImageStore>,
    ) -> Self {
        Self::new(
            bot,
            storage,
            store,
            config.base_url(),
            config.max_upload_size_bytes(),
        )
    }

    /// Ingest one event and send the matching reply. The returned error has
    /// already been logged and answered.
    #[tracing::instrument(
        skip(self, submitter, source),
        fields(kind = source.kind(), file_id = %source.file_id())
    )]
    pub async fn handle(
        &self,
        chat_id: i64,
        submitter: &Submitter,
        source: MediaSource,
    ) -> Result<ImageRecord, IngestError> {
        let show_name = matches!(source, MediaSource::Document(_));
        let start = std::time::Instant::now();

        match self.ingest(submitter, source).await {
            Ok(record) => {
                tracing::info!(
                    filename = %record.filename,
                    size_bytes = record.file_size,
                    mime = %record.mime_type,
                    user_id = %record.telegram_user_id,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Image uploaded"
                );
                let reply = Reply::uploaded(&record, &self.base_url, show_name);
                self.bot.send_reply(chat_id, &reply.render()).await;
                Ok(record)
            }
            Err(e) => {
                if e.is_rejection() {
                    tracing::info!(error = %e, "Upload rejected");
                } else {
                    tracing::error!(error = %e, "Upload failed");
                }
                let reply = e.reply(self.validator.max_file_size());
                self.bot.send_reply(chat_id, &reply.render()).await;
                Err(e)
            }
        }
    }

    async fn ingest(
        &self,
        submitter: &Submitter,
        source: MediaSource,
    ) -> Result<ImageRecord, IngestError> {
        if let MediaSource::Document(doc) = &source {
            self.validator
                .prevalidate_declared(doc.declared_mime.as_deref(), doc.declared_size)?;
        }

        let descriptor = self
            .bot
            .fetch_file_descriptor(source.file_id())
            .await
            .map_err(IngestError::Resolve)?;

        if let Some(size) = descriptor.size {
            self.validator.validate_file_size(size)?;
        }

        let extension_source = match &source {
            MediaSource::Document(doc) => doc.declared_name.as_deref(),
            MediaSource::Photo { .. } => Some(descriptor.path.as_str()),
        };
        let filename = self.allocator.allocate(extension_source);

        let download = self
            .bot
            .download_file(&descriptor.path)
            .await
            .map_err(|e| IngestError::Download(e.to_string()))?;
        let stream: ByteStream = Box::pin(download.map_err(|e| Box::new(e) as BoxError));

        let staged = self
            .storage
            .stage_stream(&filename, stream, self.validator.max_file_size())
            .await?;

        let decoded = match self.validator.inspect(staged.path()).await {
            Ok(decoded) => decoded,
            Err(e) => {
                if let Err(cleanup) = self.storage.discard(staged).await {
                    tracing::warn!(error = %cleanup, "Failed to remove rejected upload");
                }
                return Err(e.into());
            }
        };

        let (mut filename, size_bytes) = self
            .promote_staged(staged, filename, extension_source)
            .await?;

        let mut record = NewImageRecord {
            filename: filename.clone(),
            original_filename: source.original_name(),
            file_size: size_bytes as i64,
            mime_type: decoded.mime,
            telegram_user_id: submitter.id.clone(),
            telegram_username: submitter.username.clone(),
            upload_date: Utc::now(),
        };

        let result = match self.store.insert(record.clone()).await {
            Err(PersistenceError::DuplicateFilename(taken)) => {
                tracing::warn!(filename = %taken, "Filename already taken, allocating another");
                let fresh = self.allocator.allocate(extension_source);
                match self.storage.rename(&filename, &fresh).await {
                    Ok(()) => {
                        filename = fresh;
                        record.filename = filename.clone();
                        record.upload_date = Utc::now();
                        self.store.insert(record).await
                    }
                    Err(e) => {
                        self.remove_orphan(&filename).await;
                        return Err(e.into());
                    }
                }
            }
            other => other,
        };

        match result {
            Ok(record) => Ok(record),
            Err(e) => {
                self.remove_orphan(&filename).await;
                Err(e.into())
            }
        }
    }

    /// Publish the staged file, moving to a fresh name once if the allocated
    /// one is already on disk. The staged bytes are discarded on failure.
    async fn promote_staged(
        &self,
        staged: StagedFile,
        filename: String,
        extension_source: Option<&str>,
    ) -> Result<(String, u64), IngestError> {
        let result = match self.storage.promote(&staged, &filename).await {
            Ok(size_bytes) => Ok((filename, size_bytes)),
            Err(StorageError::AlreadyExists(taken)) => {
                tracing::warn!(filename = %taken, "Filename already on disk, allocating another");
                let fresh = self.allocator.allocate(extension_source);
                self.storage
                    .promote(&staged, &fresh)
                    .await
                    .map(|size_bytes| (fresh, size_bytes))
            }
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(cleanup) = self.storage.discard(staged).await {
                tracing::warn!(error = %cleanup, "Failed to remove unpublished upload");
            }
        }
        result.map_err(IngestError::from)
    }

    /// Delete a stored file whose record could not be committed.
    async fn remove_orphan(&self, filename: &str) {
        if let Err(e) = self.storage.delete(filename).await {
            tracing::error!(filename = %filename, error = %e, "Failed to remove uncommitted file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_original_name_embeds_file_id() {
        let source = MediaSource::Photo {
            file_id: "AgACAgIAAxk".to_string(),
        };
        assert_eq!(source.original_name(), "telegram_photo_AgACAgIAAxk");
    }

    #[test]
    fn document_without_name_gets_synthesized_one() {
        let source = MediaSource::Document(DocumentEvent {
            file_id: "BQAC".to_string(),
            declared_name: None,
            declared_mime: Some("image/png".to_string()),
            declared_size: Some(10),
        });
        assert_eq!(source.original_name(), "telegram_document_BQAC");
    }

    #[test]
    fn long_names_are_truncated() {
        let source = MediaSource::Document(DocumentEvent {
            file_id: "x".to_string(),
            declared_name: Some("a".repeat(400)),
            declared_mime: None,
            declared_size: None,
        });
        assert_eq!(source.original_name().chars().count(), 255);
    }

    #[test]
    fn every_error_maps_to_its_reply() {
        let max = 20 * 1024 * 1024;
        let cases = [
            (
                IngestError::Rejected(ValidationError::NotAnImage("text/plain".into())),
                Reply::NotAnImage,
            ),
            (
                IngestError::Rejected(ValidationError::UnsupportedFormat("image/bmp".into())),
                Reply::UnsupportedFormat,
            ),
            (
                IngestError::TooLarge { limit: max },
                Reply::TooLarge { max_mb: 20 },
            ),
            (
                IngestError::Rejected(ValidationError::Corrupt("bad".into())),
                Reply::Corrupt,
            ),
            (
                IngestError::Resolve(TransportError::Conflict),
                Reply::DownloadFailed,
            ),
            (
                IngestError::Persistence(PersistenceError::CorruptRow("x".into())),
                Reply::Failed,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.reply(max), expected, "{error}");
        }
    }

    #[test]
    fn storage_errors_convert_by_cause() {
        assert!(matches!(
            IngestError::from(StorageError::TooLarge { limit: 5 }),
            IngestError::TooLarge { limit: 5 }
        ));
        assert!(matches!(
            IngestError::from(StorageError::Stream("reset".into())),
            IngestError::Download(_)
        ));
        assert!(matches!(
            IngestError::from(StorageError::NotFound("a".into())),
            IngestError::Storage(_)
        ));
    }
}
