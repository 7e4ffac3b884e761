//! Imgdrop Storage Library
//!
//! Flat upload directory addressed by filename only. Incoming bytes are
//! written under a hidden staging directory and only renamed to their final
//! name once the whole stream has arrived, so readers never see a partial
//! file under a public name.
//!
//! Filenames must not be empty, start with `.`, or contain `/`, `\` or `..`.

pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::{BoxError, ByteStream, StagedFile, Storage, StorageError, StorageResult};
