pub mod db;

pub use db::{ImageRepository, ImageStore, InMemoryImageStore};
