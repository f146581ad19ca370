//! Column-wide image methods
//!
//! [`ImageMethods`] applies box operations element-wise and returns new
//! columns. Nulls stay null. It adds no invariants of its own.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::codec::format::{ContainerFormat, PixelMode};
use crate::column::ImageColumn;
use crate::error::{ImageError, Result};
use crate::value::{ImageBox, Transform};

/// Longest edge of HTML previews
const PREVIEW_SIZE: u32 = 256;

/// Element-wise view over an image column
#[derive(Debug, Clone, Copy)]
pub struct ImageMethods<'a> {
    column: &'a ImageColumn,
}

impl ImageColumn {
    /// Image methods for this column
    pub fn images(&self) -> ImageMethods<'_> {
        ImageMethods { column: self }
    }
}

impl<'a> ImageMethods<'a> {
    /// Decode every cell; the first failing cell aborts the whole call
    pub fn open(&self) -> Result<ImageColumn> {
        self.column
            .iter()
            .map(|value| {
                Ok(match value.open()? {
                    Some(decoded) => ImageBox::Decoded(decoded.clone()),
                    None => ImageBox::Null,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(ImageColumn::new)
    }

    pub fn apply(&self, transform: &Transform) -> Result<ImageColumn> {
        self.column
            .iter()
            .map(|value| value.apply(transform))
            .collect::<Result<Vec<_>>>()
            .map(ImageColumn::new)
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<ImageColumn> {
        self.apply(&Transform::resize(width, height))
    }

    pub fn thumbnail(&self, max_width: u32, max_height: u32) -> Result<ImageColumn> {
        self.apply(&Transform::Thumbnail {
            max_width,
            max_height,
        })
    }

    /// Rotate clockwise by a multiple of 90 degrees
    pub fn rotate(&self, degrees: i32) -> Result<ImageColumn> {
        self.apply(&Transform::rotate(degrees)?)
    }

    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<ImageColumn> {
        self.apply(&Transform::Crop {
            x,
            y,
            width,
            height,
        })
    }

    pub fn convert(&self, mode: PixelMode) -> Result<ImageColumn> {
        self.apply(&Transform::Convert(mode))
    }

    pub fn grayscale(&self) -> Result<ImageColumn> {
        self.apply(&Transform::Grayscale)
    }

    /// Width and height of every cell (None for nulls)
    pub fn sizes(&self) -> Result<Vec<Option<(u32, u32)>>> {
        self.column.iter().map(ImageBox::size).collect()
    }

    /// One HTML preview per cell
    pub fn html(&self) -> Result<Vec<String>> {
        self.column.iter().map(html_formatter).collect()
    }

    /// Short description for interactive display
    pub fn summary(&self) -> String {
        let decoded = self.column.iter().filter(|v| v.is_materialized()).count();
        format!(
            "{} images ({} null, {} decoded), image methods enabled",
            self.column.len(),
            self.column.null_count(),
            decoded
        )
    }
}

/// Render a cell as an inline `<img>` tag with a PNG data URI
pub fn html_formatter(value: &ImageBox) -> Result<String> {
    let Some(decoded) = value.open()? else {
        return Ok("None".to_string());
    };

    let image = decoded.image();
    let preview = if image.width() > PREVIEW_SIZE || image.height() > PREVIEW_SIZE {
        image.resize(PREVIEW_SIZE, PREVIEW_SIZE, FilterType::Triangle)
    } else {
        image.clone()
    };
    // 8-bit RGBA always fits PNG
    let preview = DynamicImage::ImageRgba8(preview.to_rgba8());

    let mut buffer = Cursor::new(Vec::new());
    preview
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|source| ImageError::Encode {
            format: ContainerFormat::Png,
            source,
        })?;

    Ok(format!(
        r#"<img style="max-height: 100px;" src="data:image/png;base64,{}">"#,
        STANDARD.encode(buffer.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::coerce::ImageValue;
    use image::RgbImage;

    fn column() -> ImageColumn {
        ImageColumn::from_values(vec![
            ImageValue::from(DynamicImage::ImageRgb8(RgbImage::new(10, 20))),
            ImageValue::Null,
            ImageValue::from(DynamicImage::ImageRgb8(RgbImage::new(4, 4))),
        ])
    }

    #[test]
    fn test_rotate_column() {
        let original = column();
        let rotated = original.images().rotate(90).unwrap();
        assert_eq!(
            rotated.images().sizes().unwrap(),
            vec![Some((20, 10)), None, Some((4, 4))]
        );
        assert_eq!(original.images().sizes().unwrap()[0], Some((10, 20)));
        assert!(original.images().rotate(30).is_err());
    }

    #[test]
    fn test_open_materializes_or_fails() {
        let png = {
            let mut out = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(RgbImage::new(3, 3))
                .write_to(&mut out, ImageFormat::Png)
                .unwrap();
            out.into_inner()
        };
        let lazy = ImageColumn::from_values(vec![ImageValue::from(png), ImageValue::Null]);
        let opened = lazy.images().open().unwrap();
        assert!(matches!(opened[0], ImageBox::Decoded(_)));
        assert!(opened[1].is_null());

        let broken = ImageColumn::from_values(vec![ImageValue::from(b"corrupt_bytes".to_vec())]);
        assert!(broken.images().open().unwrap_err().is_decode());
    }

    #[test]
    fn test_crop_out_of_bounds_fails() {
        let err = column().images().crop(0, 0, 8, 8).unwrap_err();
        assert!(matches!(err, ImageError::InvalidTransform { .. }));
    }

    #[test]
    fn test_html_preview() {
        let html = column().images().html().unwrap();
        assert!(html[0]
            .starts_with(r#"<img style="max-height: 100px;" src="data:image/png;base64,"#));
        assert_eq!(html[1], "None");
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            column().images().summary(),
            "3 images (1 null, 2 decoded), image methods enabled"
        );
    }
}
