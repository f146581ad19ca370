//! Image cell values
//!
//! This module handles:
//! - Boxed cells with lazy, memoized decoding (image_box.rs)
//! - Decoded pixel buffers and their metadata (decoded.rs)
//! - The closed set of pixel transforms (transform.rs)

pub mod decoded;
pub mod image_box;
pub mod transform;

pub use decoded::DecodedImage;
pub use image_box::{EncodedImage, EncodedSource, ImageBox};
pub use transform::{ResizeFilter, Rotation, Transform};
