use crate::traits::{ByteStream, StagedFile, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STAGING_DIR: &str = ".incoming";
const STAGING_SUFFIX: &str = ".part";

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create the upload directory (and its staging area) if missing, then
    /// sweep staging files left behind by an earlier crash.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(base_path.join(STAGING_DIR))
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;

        let storage = LocalStorage { base_path };
        storage.sweep_staging().await?;
        Ok(storage)
    }

    /// Remove every `.part` file in the staging area. Only called before the
    /// storage is handed out, so no download can be in flight.
    async fn sweep_staging(&self) -> StorageResult<usize> {
        let staging = self.base_path.join(STAGING_DIR);
        let mut entries = fs::read_dir(&staging).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.to_string_lossy().ends_with(STAGING_SUFFIX) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale staging file")
                }
            }
        }

        if removed > 0 {
            tracing::info!(
                staging = %staging.display(),
                removed = removed,
                "Removed stale staging files"
            );
        }
        Ok(removed)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a filename to its path, refusing anything that is not a plain
    /// name inside the flat upload directory.
    fn key_to_path(&self, filename: &str) -> StorageResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self.base_path.join(filename))
    }

    fn staging_path(&self, filename: &str) -> StorageResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self
            .base_path
            .join(STAGING_DIR)
            .join(format!("{}{}", filename, STAGING_SUFFIX)))
    }

    async fn write_stream(
        &self,
        path: &Path,
        mut stream: ByteStream,
        max_bytes: u64,
    ) -> StorageResult<u64> {
        let mut file = fs::File::create(path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::Stream(e.to_string()))?;
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(StorageError::TooLarge { limit: max_bytes });
            }
            file.write_all(&chunk).await?;
        }

        file.sync_all().await?;
        Ok(written)
    }
}

/// Hard-link `from` to `to`. Linking fails atomically when `to` exists, so an
/// existing file is never replaced.
async fn link_no_clobber(from: &Path, to: &Path, key: &str) -> StorageResult<()> {
    match fs::hard_link(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(StorageError::AlreadyExists(key.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Drop the old name after a successful link.
async fn remove_source(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove source after link");
    }
}

/// Reject names that could escape or shadow the flat upload directory.
pub fn validate_filename(filename: &str) -> StorageResult<()> {
    if filename.is_empty()
        || filename.starts_with('.')
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0')
    {
        return Err(StorageError::InvalidKey(filename.to_string()));
    }
    Ok(())
}

#[async_trait]
impl Storage for LocalStorage {
    async fn stage_stream(
        &self,
        filename: &str,
        stream: ByteStream,
        max_bytes: u64,
    ) -> StorageResult<StagedFile> {
        let path = self.staging_path(filename)?;
        let start = std::time::Instant::now();

        match self.write_stream(&path, stream, max_bytes).await {
            Ok(size_bytes) => {
                tracing::debug!(
                    path = %path.display(),
                    size_bytes = size_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Staged incoming file"
                );
                Ok(StagedFile { path, size_bytes })
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            path = %path.display(),
                            error = %cleanup,
                            "Failed to remove abandoned staging file"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn promote(&self, staged: &StagedFile, filename: &str) -> StorageResult<u64> {
        let path = self.key_to_path(filename)?;

        link_no_clobber(&staged.path, &path, filename).await?;
        remove_source(&staged.path).await;
        let size_bytes = fs::metadata(&path).await?.len();

        tracing::info!(
            path = %path.display(),
            key = %filename,
            size_bytes = size_bytes,
            "Local storage upload successful"
        );

        Ok(size_bytes)
    }

    async fn discard(&self, staged: StagedFile) -> StorageResult<()> {
        match fs::remove_file(&staged.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let from_path = self.key_to_path(from)?;
        let to_path = self.key_to_path(to)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from.to_string()));
        }

        link_no_clobber(&from_path, &to_path, to).await?;
        remove_source(&from_path).await;

        tracing::info!(from_key = %from, to_key = %to, "Local storage rename successful");
        Ok(())
    }

    async fn delete(&self, filename: &str) -> StorageResult<()> {
        let path = self.key_to_path(filename)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), key = %filename, "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, filename: &str) -> StorageResult<bool> {
        let path = self.key_to_path(filename)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, filename: &str) -> StorageResult<u64> {
        let path = self.key_to_path(filename)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn download_stream(
        &self,
        filename: &str,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>> {
        let path = self.key_to_path(filename)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let key = filename.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |item| {
            item.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Local storage stream read error");
                StorageError::Io(e)
            })
        });

        Ok(Box::pin(stream))
    }
}
