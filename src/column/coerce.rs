//! Accepted construction shapes for image columns
//!
//! Raw bytes become lazy encoded boxes, strings become file references,
//! persisted records go through the codec, and boxes pass through as-is.

use std::path::PathBuf;

use image::DynamicImage;

use super::persisted::PersistedCell;
use crate::codec::ImageCodec;
use crate::value::ImageBox;

/// One input element for [`ImageColumn::from_values`](super::ImageColumn::from_values)
#[derive(Debug, Clone, PartialEq)]
pub enum ImageValue {
    Null,
    Bytes(Vec<u8>),
    Path(PathBuf),
    Boxed(ImageBox),
    Cell(PersistedCell),
}

impl ImageValue {
    /// Normalize into a box; never decodes
    pub fn into_box(self, codec: &ImageCodec) -> ImageBox {
        match self {
            ImageValue::Null => ImageBox::Null,
            ImageValue::Bytes(data) => ImageBox::from_bytes(data),
            ImageValue::Path(path) => ImageBox::from_path(path),
            ImageValue::Boxed(boxed) => boxed,
            ImageValue::Cell(cell) => codec.decode(&cell),
        }
    }
}

impl From<Vec<u8>> for ImageValue {
    fn from(data: Vec<u8>) -> Self {
        ImageValue::Bytes(data)
    }
}

impl From<&[u8]> for ImageValue {
    fn from(data: &[u8]) -> Self {
        ImageValue::Bytes(data.to_vec())
    }
}

impl From<String> for ImageValue {
    fn from(path: String) -> Self {
        ImageValue::Path(PathBuf::from(path))
    }
}

impl From<&str> for ImageValue {
    fn from(path: &str) -> Self {
        ImageValue::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for ImageValue {
    fn from(path: PathBuf) -> Self {
        ImageValue::Path(path)
    }
}

impl From<ImageBox> for ImageValue {
    fn from(boxed: ImageBox) -> Self {
        ImageValue::Boxed(boxed)
    }
}

impl From<DynamicImage> for ImageValue {
    fn from(image: DynamicImage) -> Self {
        ImageValue::Boxed(ImageBox::from_image(image))
    }
}

impl From<PersistedCell> for ImageValue {
    fn from(cell: PersistedCell) -> Self {
        ImageValue::Cell(cell)
    }
}

impl<T: Into<ImageValue>> From<Option<T>> for ImageValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ImageValue::Null, Into::into)
    }
}
