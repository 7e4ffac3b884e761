//! Data models for the application

mod image;
mod mime;

pub use image::*;
pub use mime::*;
