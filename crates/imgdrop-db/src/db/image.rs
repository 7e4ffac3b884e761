use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imgdrop_core::{ImageMime, ImageRecord, NewImageRecord, PersistenceError};
use sqlx::{FromRow, PgPool, Postgres};

use super::ImageStore;

const SELECT_COLUMNS: &str = "id, filename, original_filename, file_size, mime_type, \
     telegram_user_id, telegram_username, upload_date";

#[derive(Debug, FromRow)]
struct ImageRecordRow {
    id: i64,
    filename: String,
    original_filename: String,
    file_size: i64,
    mime_type: String,
    telegram_user_id: String,
    telegram_username: Option<String>,
    upload_date: DateTime<Utc>,
}

impl TryFrom<ImageRecordRow> for ImageRecord {
    type Error = PersistenceError;

    fn try_from(row: ImageRecordRow) -> Result<Self, Self::Error> {
        let mime_type = ImageMime::from_content_type(&row.mime_type).ok_or_else(|| {
            PersistenceError::CorruptRow(format!(
                "record {} has unsupported mime type {}",
                row.id, row.mime_type
            ))
        })?;

        Ok(ImageRecord {
            id: row.id,
            filename: row.filename,
            original_filename: row.original_filename,
            file_size: row.file_size,
            mime_type,
            telegram_user_id: row.telegram_user_id,
            telegram_username: row.telegram_username,
            upload_date: row.upload_date,
        })
    }
}

fn map_insert_error(err: sqlx::Error, filename: &str) -> PersistenceError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return PersistenceError::DuplicateFilename(filename.to_string());
        }
    }
    PersistenceError::Database(err)
}

/// Repository for the `uploaded_images` table
#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageStore for ImageRepository {
    #[tracing::instrument(
        skip(self, record),
        fields(db.table = "uploaded_images", db.operation = "insert", filename = %record.filename)
    )]
    async fn insert(&self, record: NewImageRecord) -> Result<ImageRecord, PersistenceError> {
        let query = format!(
            r#"
            INSERT INTO uploaded_images
                (filename, original_filename, file_size, mime_type,
                 telegram_user_id, telegram_username, upload_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, ImageRecordRow>(&query)
            .bind(&record.filename)
            .bind(&record.original_filename)
            .bind(record.file_size)
            .bind(record.mime_type.as_str())
            .bind(&record.telegram_user_id)
            .bind(&record.telegram_username)
            .bind(record.upload_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, &record.filename))?;

        row.try_into()
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploaded_images", db.operation = "select"))]
    async fn get_by_filename(
        &self,
        filename: &str,
    ) -> Result<Option<ImageRecord>, PersistenceError> {
        let query = format!(
            "SELECT {} FROM uploaded_images WHERE filename = $1",
            SELECT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, ImageRecordRow>(&query)
            .bind(filename)
            .fetch_optional(&self.pool)
            .await
            .map_err(PersistenceError::Database)?;

        row.map(ImageRecord::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploaded_images", db.operation = "count"))]
    async fn count(&self) -> Result<i64, PersistenceError> {
        sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM uploaded_images")
            .fetch_one(&self.pool)
            .await
            .map_err(PersistenceError::Database)
    }
}
