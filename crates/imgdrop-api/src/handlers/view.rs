use crate::handlers::pages::{error_page, escape_html, layout};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use imgdrop_core::ImageRecord;
use imgdrop_storage::local::validate_filename;
use std::sync::Arc;

/// HTML page for one image, or an error page when it does not exist.
pub async fn view_image(
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if validate_filename(&filename).is_err() {
        return not_found();
    }

    match state.store.get_by_filename(&filename).await {
        Ok(Some(record)) => Html(render_view(&record, &state.base_url)).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!(error = %e, filename = %filename, "Failed to load image record");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(error_page(
                    "Something went wrong",
                    "The image could not be loaded. Please try again later.",
                )),
            )
                .into_response()
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(error_page(
            "Image not found",
            "This image does not exist or was removed.",
        )),
    )
        .into_response()
}

fn render_view(record: &ImageRecord, base_url: &str) -> String {
    let direct_url = escape_html(&record.direct_url(base_url));
    let name = escape_html(&record.original_filename);

    let body = format!(
        "<h1>{name}</h1>\n\
         <p><img src=\"{src}\" alt=\"{name}\"></p>\n\
         <dl>\n\
         <dt>Size</dt><dd>{size}</dd>\n\
         <dt>Type</dt><dd>{mime}</dd>\n\
         <dt>Uploaded</dt><dd>{date}</dd>\n\
         </dl>\n\
         <p><label>Direct link<br><input type=\"text\" readonly value=\"{direct}\"></label></p>\n\
         <p><a href=\"{src}\">Open original</a></p>",
        name = name,
        src = escape_html(&record.direct_path()),
        size = record.size_kib(),
        mime = record.mime_type.as_str(),
        date = record.upload_date.format("%Y-%m-%d %H:%M UTC"),
        direct = direct_url,
    );

    layout(&record.original_filename, &body)
}
