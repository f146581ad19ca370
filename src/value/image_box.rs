//! Boxed image values
//!
//! An [`ImageBox`] is one cell of an image column. It is either null, an
//! encoded payload that has not been decoded yet, or a decoded pixel buffer.
//! Encoded boxes decode lazily on the first [`ImageBox::open`] and keep the
//! result for every later call.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use image::DynamicImage;
use log::debug;

use super::decoded::DecodedImage;
use super::transform::Transform;
use crate::codec::format::ContainerFormat;
use crate::error::{ImageError, Result};

/// Where an encoded image's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedSource {
    /// Raw container bytes, with an optional provenance label
    Bytes { data: Vec<u8>, label: Option<String> },
    /// A local file, read on first open
    File(PathBuf),
}

/// An encoded image plus its memoized decode
#[derive(Debug)]
pub struct EncodedImage {
    source: EncodedSource,
    decoded: OnceLock<DecodedImage>,
    // Serializes first opens so concurrent callers share one decode
    init: Mutex<()>,
}

impl EncodedImage {
    pub fn new(source: EncodedSource) -> Self {
        Self {
            source,
            decoded: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &EncodedSource {
        &self.source
    }

    pub fn is_materialized(&self) -> bool {
        self.decoded.get().is_some()
    }

    /// Decode the payload once and return the cached buffer afterwards
    pub fn open(&self) -> Result<&DecodedImage> {
        if let Some(decoded) = self.decoded.get() {
            return Ok(decoded);
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(decoded) = self.decoded.get() {
            return Ok(decoded);
        }

        let decoded = match &self.source {
            EncodedSource::Bytes { data, label } => decode_bytes(data, label.clone())?,
            EncodedSource::File(path) => {
                let data = fs::read(path).map_err(|e| ImageError::io(path, e))?;
                decode_bytes(&data, Some(path.display().to_string()))?
            }
        };
        Ok(self.decoded.get_or_init(|| decoded))
    }
}

impl Clone for EncodedImage {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            decoded: self.decoded.clone(),
            init: Mutex::new(()),
        }
    }
}

impl PartialEq for EncodedImage {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Decode container bytes, detecting the format from the magic number
pub(crate) fn decode_bytes(data: &[u8], label: Option<String>) -> Result<DecodedImage> {
    let format = image::guess_format(data).map_err(|source| ImageError::Decode {
        label: label.clone(),
        source,
    })?;
    let image = image::load_from_memory_with_format(data, format).map_err(|source| {
        ImageError::Decode {
            label: label.clone(),
            source,
        }
    })?;

    debug!(
        "decoded {:?} image {}x{} ({} bytes)",
        format,
        image.width(),
        image.height(),
        data.len()
    );

    Ok(DecodedImage::new(image)
        .with_source_format(ContainerFormat::from_image_format(format))
        .with_label(label))
}

/// One image cell: null, lazily encoded, or decoded
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ImageBox {
    #[default]
    Null,
    Encoded(EncodedImage),
    Decoded(DecodedImage),
}

impl ImageBox {
    pub fn null() -> Self {
        ImageBox::Null
    }

    /// Wrap raw container bytes without decoding them
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        ImageBox::Encoded(EncodedImage::new(EncodedSource::Bytes {
            data: data.into(),
            label: None,
        }))
    }

    /// Wrap raw container bytes with a provenance label (e.g. a filename)
    pub fn from_bytes_with_label(data: impl Into<Vec<u8>>, label: impl Into<String>) -> Self {
        let label = label.into();
        ImageBox::Encoded(EncodedImage::new(EncodedSource::Bytes {
            data: data.into(),
            label: (!label.is_empty()).then_some(label),
        }))
    }

    /// Reference a local file; nothing is read until the box is opened
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        ImageBox::Encoded(EncodedImage::new(EncodedSource::File(path.into())))
    }

    pub fn from_image(image: DynamicImage) -> Self {
        ImageBox::Decoded(DecodedImage::new(image))
    }

    pub fn from_decoded(decoded: DecodedImage) -> Self {
        ImageBox::Decoded(decoded)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ImageBox::Null)
    }

    /// Whether pixels are available without decoding
    pub fn is_materialized(&self) -> bool {
        match self {
            ImageBox::Null => false,
            ImageBox::Encoded(encoded) => encoded.is_materialized(),
            ImageBox::Decoded(_) => true,
        }
    }

    /// Materialize the pixels
    ///
    /// Null boxes yield `Ok(None)`. Encoded boxes are decoded at most once;
    /// a corrupt payload fails with a decode error and a missing file with an
    /// I/O error, every time it is opened.
    pub fn open(&self) -> Result<Option<&DecodedImage>> {
        match self {
            ImageBox::Null => Ok(None),
            ImageBox::Encoded(encoded) => encoded.open().map(Some),
            ImageBox::Decoded(decoded) => Ok(Some(decoded)),
        }
    }

    /// Apply a transform, returning a new decoded box; `self` is unchanged
    pub fn apply(&self, transform: &Transform) -> Result<ImageBox> {
        let Some(decoded) = self.open()? else {
            return Ok(ImageBox::Null);
        };
        let image = transform.run(decoded.image())?;
        let label = decoded.label().map(str::to_string);
        Ok(ImageBox::Decoded(DecodedImage::new(image).with_label(label)))
    }

    /// Width and height, decoding if needed
    pub fn size(&self) -> Result<Option<(u32, u32)>> {
        Ok(self.open()?.map(|d| (d.width(), d.height())))
    }

    /// Best-known provenance label
    pub fn label(&self) -> Option<&str> {
        match self {
            ImageBox::Null => None,
            ImageBox::Encoded(encoded) => match encoded.source() {
                EncodedSource::Bytes { label, .. } => label.as_deref(),
                EncodedSource::File(path) => path.to_str(),
            },
            ImageBox::Decoded(decoded) => decoded.label(),
        }
    }

    /// The original container bytes, if this box still carries them
    pub fn encoded_bytes(&self) -> Option<&[u8]> {
        match self {
            ImageBox::Encoded(encoded) => match encoded.source() {
                EncodedSource::Bytes { data, .. } => Some(data),
                EncodedSource::File(_) => None,
            },
            _ => None,
        }
    }

    /// The referenced file, for path-backed boxes
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ImageBox::Encoded(encoded) => match encoded.source() {
                EncodedSource::File(path) => Some(path),
                EncodedSource::Bytes { .. } => None,
            },
            _ => None,
        }
    }
}

impl From<DynamicImage> for ImageBox {
    fn from(image: DynamicImage) -> Self {
        ImageBox::from_image(image)
    }
}

impl From<DecodedImage> for ImageBox {
    fn from(decoded: DecodedImage) -> Self {
        ImageBox::Decoded(decoded)
    }
}

fn write_decoded(f: &mut fmt::Formatter<'_>, decoded: &DecodedImage) -> fmt::Result {
    match decoded.mode() {
        Some(mode) => write!(
            f,
            "<Image size={}x{} mode={}>",
            decoded.width(),
            decoded.height(),
            mode
        ),
        None => write!(f, "<Image size={}x{}>", decoded.width(), decoded.height()),
    }
}

impl fmt::Display for ImageBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageBox::Null => f.write_str("None"),
            ImageBox::Decoded(decoded) => write_decoded(f, decoded),
            ImageBox::Encoded(encoded) => match (encoded.decoded.get(), encoded.source()) {
                (Some(decoded), _) => write_decoded(f, decoded),
                (None, EncodedSource::Bytes { data, .. }) => {
                    write!(f, "<Image encoded bytes={}>", data.len())
                }
                (None, EncodedSource::File(path)) => {
                    write!(f, "<Image path={}>", path.display())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::format::PixelMode;
    use crate::value::transform::Rotation;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;
    use std::thread;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([9, 8, 7])));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_open_is_memoized() {
        let boxed = ImageBox::from_bytes(png_bytes(10, 10));
        assert!(!boxed.is_materialized());

        let first = boxed.open().unwrap().unwrap();
        assert!(boxed.is_materialized());
        let second = boxed.open().unwrap().unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(first.source_format(), Some(ContainerFormat::Png));
        assert_eq!(first.mode(), Some(PixelMode::Rgb8));
    }

    #[test]
    fn test_corrupt_bytes_fail_on_open_only() {
        let boxed = ImageBox::from_bytes_with_label(b"corrupt_bytes".to_vec(), "bad.png");
        assert_eq!(boxed.encoded_bytes(), Some(&b"corrupt_bytes"[..]));

        let err = boxed.open().unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("bad.png"));
        // Errors are not cached as success
        assert!(boxed.open().is_err());
        assert!(!boxed.is_materialized());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let boxed = ImageBox::from_path("/nonexistent/path/cat.png");
        assert!(matches!(boxed.open(), Err(ImageError::Io { .. })));
    }

    #[test]
    fn test_file_reference_opens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cat.png");
        fs::write(&path, png_bytes(4, 3)).unwrap();

        let boxed = ImageBox::from_path(&path);
        assert_eq!(boxed.file_path(), Some(path.as_path()));
        assert_eq!(boxed.size().unwrap(), Some((4, 3)));
        assert_eq!(boxed.label(), path.to_str());
    }

    #[test]
    fn test_null_open_and_apply() {
        let boxed = ImageBox::null();
        assert!(boxed.open().unwrap().is_none());
        assert!(boxed.apply(&Transform::Grayscale).unwrap().is_null());
        assert_eq!(boxed.to_string(), "None");
    }

    #[test]
    fn test_apply_leaves_original_unchanged() {
        let original = ImageBox::from_image(DynamicImage::ImageRgb8(RgbImage::new(10, 20)));
        let rotated = original.apply(&Transform::Rotate(Rotation::Deg90)).unwrap();

        assert_eq!(rotated.size().unwrap(), Some((20, 10)));
        assert_eq!(original.size().unwrap(), Some((10, 20)));
        assert!(matches!(rotated, ImageBox::Decoded(_)));
    }

    #[test]
    fn test_apply_keeps_label_and_drops_format() {
        let boxed = ImageBox::from_bytes_with_label(png_bytes(6, 6), "cat.png");
        let flipped = boxed.apply(&Transform::FlipVertical).unwrap();
        let decoded = flipped.open().unwrap().unwrap();
        assert_eq!(decoded.label(), Some("cat.png"));
        assert_eq!(decoded.source_format(), None);
    }

    #[test]
    fn test_display() {
        let boxed = ImageBox::from_bytes(png_bytes(3, 2));
        assert_eq!(boxed.to_string(), format!("<Image encoded bytes={}>", png_bytes(3, 2).len()));
        boxed.open().unwrap();
        assert_eq!(boxed.to_string(), "<Image size=3x2 mode=RGB>");
        assert_eq!(ImageBox::from_path("a.png").to_string(), "<Image path=a.png>");
    }

    #[test]
    fn test_clone_is_independent_value() {
        let boxed = ImageBox::from_bytes(png_bytes(2, 2));
        boxed.open().unwrap();
        let copy = boxed.clone();
        assert!(copy.is_materialized());
        assert_eq!(copy, boxed);
        assert!(!std::ptr::eq(
            copy.open().unwrap().unwrap(),
            boxed.open().unwrap().unwrap()
        ));
    }

    #[test]
    fn test_concurrent_open_converges() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ImageBox>();

        let boxed = Arc::new(ImageBox::from_bytes(png_bytes(16, 16)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let boxed = Arc::clone(&boxed);
                thread::spawn(move || {
                    let decoded = boxed.open().unwrap().unwrap();
                    decoded as *const DecodedImage as usize
                })
            })
            .collect();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }
}
