//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Public, read-only routes of the image host.
pub fn setup_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index::index))
        .route("/health", get(handlers::health::health_check))
        .route("/image/{filename}", get(handlers::image::serve_image))
        .route("/view/{filename}", get(handlers::view::view_image))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
