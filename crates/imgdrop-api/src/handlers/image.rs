use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::StreamExt;
use imgdrop_core::AppError;
use imgdrop_storage::local::validate_filename;
use std::sync::Arc;

/// Raw image bytes. Only files with a metadata record are served, and the
/// record's MIME type is used as the content type.
pub async fn serve_image(
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    validate_filename(&filename)
        .map_err(|_| AppError::InvalidInput("Invalid filename".to_string()))?;

    let record = state
        .store
        .get_by_filename(&filename)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    let length = state.storage.content_length(&filename).await.map_err(|e| {
        tracing::warn!(error = %e, filename = %filename, "Record exists but file is unreadable");
        HttpAppError::from(e)
    })?;
    let stream = state.storage.download_stream(&filename).await?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    tracing::debug!(filename = %filename, size_bytes = length, mime = %record.mime_type, "Serving image");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.mime_type.as_str())
        .header(header::CONTENT_LENGTH, length)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string()).into()
        })
}
