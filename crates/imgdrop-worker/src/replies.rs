//! User-facing reply texts.

use chrono::{DateTime, Utc};
use imgdrop_core::ImageRecord;

const SUPPORTED_FORMATS: &str = "• JPG/JPEG\n• PNG\n• GIF\n• WebP";

/// Every message the bot can send back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Welcome,
    Help,
    Uploaded {
        view_url: String,
        direct_url: String,
        /// Shown for documents only; photos carry no real name.
        original_name: Option<String>,
        size: String,
        format: String,
        uploaded_at: DateTime<Utc>,
    },
    NotAnImage,
    UnsupportedFormat,
    TooLarge { max_mb: u64 },
    Corrupt,
    DownloadFailed,
    Failed,
}

impl Reply {
    pub fn uploaded(record: &ImageRecord, base_url: &str, show_name: bool) -> Self {
        Reply::Uploaded {
            view_url: record.view_url(base_url),
            direct_url: record.direct_url(base_url),
            original_name: show_name.then(|| record.original_filename.clone()),
            size: record.size_kib(),
            format: record.mime_type.to_string(),
            uploaded_at: record.upload_date,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Reply::Welcome => format!(
                "Hi! I'm an image hosting bot.\n\n\
                 Send me an image and I'll give you a permanent web link for it.\n\n\
                 Supported formats:\n{}\n\n\
                 Send a photo or an image file to get started.",
                SUPPORTED_FORMATS
            ),
            Reply::Help => format!(
                "Send me an image!\n\n\
                 Supported formats:\n{}\n\n\
                 You can send it as a photo or as a file.\n\n\
                 /start - show the welcome message",
                SUPPORTED_FORMATS
            ),
            Reply::Uploaded {
                view_url,
                direct_url,
                original_name,
                size,
                format,
                uploaded_at,
            } => {
                let name_line = original_name
                    .as_ref()
                    .map(|name| format!("• Name: {}\n", name))
                    .unwrap_or_default();
                format!(
                    "Image uploaded!\n\n\
                     View page:\n{}\n\n\
                     Direct link:\n{}\n\n\
                     File details:\n\
                     {}• Size: {}\n\
                     • Format: {}\n\
                     • Uploaded: {}",
                    view_url,
                    direct_url,
                    name_line,
                    size,
                    format,
                    uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
                )
            }
            Reply::NotAnImage => "Only image files can be uploaded.".to_string(),
            Reply::UnsupportedFormat => format!(
                "Unsupported image format. Please send one of:\n{}",
                SUPPORTED_FORMATS
            ),
            Reply::TooLarge { max_mb } => {
                format!("The file is too large. Maximum size: {}MB", max_mb)
            }
            Reply::Corrupt => "The file is corrupted or is not an image.".to_string(),
            Reply::DownloadFailed => {
                "Could not download the file from Telegram. Please try again.".to_string()
            }
            Reply::Failed => {
                "Something went wrong while saving your image. Please try again.".to_string()
            }
        }
    }
}
