//! imgdrop API library
//!
//! Startup wiring for the image host: the Telegram polling loop that ingests
//! uploads and the web surface that serves them back.

mod handlers;
mod telemetry;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
