use crate::error::HttpAppError;
use crate::handlers::pages::layout;
use crate::state::AppState;
use axum::{extract::State, response::Html};
use std::sync::Arc;

/// Landing page with a short description and the number of hosted images.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, HttpAppError> {
    let count = state.store.count().await?;

    let body = format!(
        "<h1>imgdrop</h1>\n\
         <p>Send a photo or an image file to the Telegram bot and get a public link back.</p>\n\
         <p>Supported formats: JPEG, PNG, GIF, WebP. Maximum size: {}MB.</p>\n\
         <p>Images hosted: <strong>{}</strong></p>",
        state.max_upload_size_bytes / 1024 / 1024,
        count
    );

    Ok(Html(layout("imgdrop", &body)))
}
