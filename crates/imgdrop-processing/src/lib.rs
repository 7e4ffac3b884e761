//! Imgdrop Processing Library
//!
//! Checks that incoming files really are supported images and allocates the
//! random names they are stored under.

pub mod allocator;
pub mod validator;

pub use allocator::FilenameAllocator;
pub use validator::{DecodedImage, MediaValidator, ValidationError};
