use image::{GenericImageView, ImageFormat, ImageReader};
use imgdrop_core::ImageMime;
use std::path::{Path, PathBuf};

/// Reasons an incoming file is refused.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Declared content type is missing or not `image/*`.
    #[error("Not an image: {0}")]
    NotAnImage(String),

    /// An image, but not one of the stored formats.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// Bytes do not decode as an image.
    #[error("Corrupt image: {0}")]
    Corrupt(String),

    #[error("Empty file")]
    EmptyFile,
}

/// What decoding established about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedImage {
    /// Format derived from the bytes, authoritative over anything declared.
    pub mime: ImageMime,
    pub width: u32,
    pub height: u32,
}

/// Media file validator
///
/// `prevalidate_declared` runs on sender-supplied metadata before anything is
/// downloaded; `inspect` decodes the downloaded bytes.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    max_file_size: u64,
}

impl MediaValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Cheap checks on declared metadata. A missing declared size passes;
    /// the streamed size ceiling catches it during download.
    pub fn prevalidate_declared(
        &self,
        declared_mime: Option<&str>,
        declared_size: Option<u64>,
    ) -> Result<ImageMime, ValidationError> {
        let declared = declared_mime.unwrap_or("").trim();
        if !declared.to_lowercase().starts_with("image/") {
            return Err(ValidationError::NotAnImage(if declared.is_empty() {
                "no content type".to_string()
            } else {
                declared.to_string()
            }));
        }

        let mime = ImageMime::from_content_type(declared)
            .ok_or_else(|| ValidationError::UnsupportedFormat(declared.to_string()))?;

        if let Some(size) = declared_size {
            self.validate_file_size(size)?;
        }

        Ok(mime)
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Decode the file at `path` off the async pool and derive its format.
    pub async fn inspect(&self, path: &Path) -> Result<DecodedImage, ValidationError> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| ValidationError::Corrupt(format!("unreadable file: {}", e)))?
            .len();
        self.validate_file_size(size)?;

        let path: PathBuf = path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || decode_file(&path))
            .await
            .map_err(|e| ValidationError::Corrupt(format!("decode task failed: {}", e)))??;

        tracing::debug!(
            mime = %decoded.mime,
            width = decoded.width,
            height = decoded.height,
            size_bytes = size,
            "Image decoded"
        );

        Ok(decoded)
    }
}

/// Map a decoded container format onto the stored set.
pub fn mime_for_format(format: ImageFormat) -> Option<ImageMime> {
    match format {
        ImageFormat::Jpeg => Some(ImageMime::Jpeg),
        ImageFormat::Png => Some(ImageMime::Png),
        ImageFormat::Gif => Some(ImageMime::Gif),
        ImageFormat::WebP => Some(ImageMime::Webp),
        _ => None,
    }
}

fn decode_file(path: &Path) -> Result<DecodedImage, ValidationError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| ValidationError::Corrupt(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| ValidationError::Corrupt("unrecognized image data".to_string()))?;

    let mime = mime_for_format(format)
        .ok_or_else(|| ValidationError::UnsupportedFormat(format!("{:?}", format)))?;

    let img = reader
        .decode()
        .map_err(|e| ValidationError::Corrupt(e.to_string()))?;
    let (width, height) = img.dimensions();

    Ok(DecodedImage {
        mime,
        width,
        height,
    })
}
