use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ImageMime;
use crate::constants::{IMAGE_ROUTE, VIEW_ROUTE};

/// One stored upload.
///
/// Created once by the ingestion pipeline after the file is fully on disk and
/// validated; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    /// Generated storage name, unique across all records.
    pub filename: String,
    /// Name supplied by the client. May repeat across records.
    pub original_filename: String,
    /// Bytes actually written to storage.
    pub file_size: i64,
    pub mime_type: ImageMime,
    pub telegram_user_id: String,
    pub telegram_username: Option<String>,
    pub upload_date: DateTime<Utc>,
}

impl ImageRecord {
    /// Relative path of the HTML view page.
    pub fn view_path(&self) -> String {
        format!("{}/{}", VIEW_ROUTE, self.filename)
    }

    /// Relative path of the raw image bytes.
    pub fn direct_path(&self) -> String {
        format!("{}/{}", IMAGE_ROUTE, self.filename)
    }

    pub fn view_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.view_path())
    }

    pub fn direct_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.direct_path())
    }

    /// Size in KiB with one decimal, as shown to users.
    pub fn size_kib(&self) -> String {
        format!("{:.1} KB", self.file_size as f64 / 1024.0)
    }
}

/// Insert payload for a new [`ImageRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewImageRecord {
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: ImageMime,
    pub telegram_user_id: String,
    pub telegram_username: Option<String>,
    pub upload_date: DateTime<Utc>,
}

impl NewImageRecord {
    /// Attach the store-assigned id.
    pub fn into_record(self, id: i64) -> ImageRecord {
        ImageRecord {
            id,
            filename: self.filename,
            original_filename: self.original_filename,
            file_size: self.file_size,
            mime_type: self.mime_type,
            telegram_user_id: self.telegram_user_id,
            telegram_username: self.telegram_username,
            upload_date: self.upload_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageRecord {
        NewImageRecord {
            filename: "0f1e2d3c4b5a69788796a5b4c3d2e1f0.png".to_string(),
            original_filename: "cat.png".to_string(),
            file_size: 51_200,
            mime_type: ImageMime::Png,
            telegram_user_id: "42".to_string(),
            telegram_username: Some("alice".to_string()),
            upload_date: Utc::now(),
        }
        .into_record(7)
    }

    #[test]
    fn urls_join_base_without_double_slash() {
        let record = sample();
        assert_eq!(
            record.view_url("https://img.example.com/"),
            "https://img.example.com/view/0f1e2d3c4b5a69788796a5b4c3d2e1f0.png"
        );
        assert_eq!(
            record.direct_url("https://img.example.com"),
            "https://img.example.com/image/0f1e2d3c4b5a69788796a5b4c3d2e1f0.png"
        );
    }

    #[test]
    fn size_is_rendered_in_kib() {
        assert_eq!(sample().size_kib(), "50.0 KB");
    }
}
