//! Container formats and pixel modes
//!
//! Maps the `image` crate's format and color enums onto the closed set of
//! containers this crate writes, and records which pixel modes each
//! container can store losslessly enough to round-trip.

use std::fmt;

use image::{ColorType, ImageFormat};
use serde::{Deserialize, Serialize};

/// Output containers a decoded buffer can be serialized into
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    WebP,
}

impl ContainerFormat {
    /// Every container, in preference order
    pub const ALL: [ContainerFormat; 5] = [
        ContainerFormat::Png,
        ContainerFormat::Tiff,
        ContainerFormat::Jpeg,
        ContainerFormat::Bmp,
        ContainerFormat::WebP,
    ];

    /// Map a detected `image` format onto a writable container, if any
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(ContainerFormat::Png),
            ImageFormat::Jpeg => Some(ContainerFormat::Jpeg),
            ImageFormat::Tiff => Some(ContainerFormat::Tiff),
            ImageFormat::Bmp => Some(ContainerFormat::Bmp),
            ImageFormat::WebP => Some(ContainerFormat::WebP),
            _ => None,
        }
    }

    pub fn to_image_format(self) -> ImageFormat {
        match self {
            ContainerFormat::Png => ImageFormat::Png,
            ContainerFormat::Jpeg => ImageFormat::Jpeg,
            ContainerFormat::Tiff => ImageFormat::Tiff,
            ContainerFormat::Bmp => ImageFormat::Bmp,
            ContainerFormat::WebP => ImageFormat::WebP,
        }
    }

    /// Canonical file extension (without the dot)
    pub fn extension(self) -> &'static str {
        match self {
            ContainerFormat::Png => "png",
            ContainerFormat::Jpeg => "jpg",
            ContainerFormat::Tiff => "tiff",
            ContainerFormat::Bmp => "bmp",
            ContainerFormat::WebP => "webp",
        }
    }

    /// Every extension that identifies this container on disk
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ContainerFormat::Png => &["png"],
            ContainerFormat::Jpeg => &["jpg", "jpeg", "jpe", "jfif"],
            ContainerFormat::Tiff => &["tif", "tiff"],
            ContainerFormat::Bmp => &["bmp"],
            ContainerFormat::WebP => &["webp"],
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ContainerFormat::Png => "image/png",
            ContainerFormat::Jpeg => "image/jpeg",
            ContainerFormat::Tiff => "image/tiff",
            ContainerFormat::Bmp => "image/bmp",
            ContainerFormat::WebP => "image/webp",
        }
    }

    /// Whether the `image` encoder for this container accepts the pixel mode
    pub fn supports(self, mode: PixelMode) -> bool {
        use PixelMode::*;
        match self {
            ContainerFormat::Png => matches!(
                mode,
                L8 | La8 | Rgb8 | Rgba8 | L16 | La16 | Rgb16 | Rgba16
            ),
            ContainerFormat::Jpeg => matches!(mode, L8 | Rgb8),
            ContainerFormat::Tiff => {
                matches!(mode, L8 | L16 | Rgb8 | Rgba8 | Rgb16 | Rgba16 | Rgb32F | Rgba32F)
            }
            ContainerFormat::Bmp => matches!(mode, L8 | La8 | Rgb8 | Rgba8),
            ContainerFormat::WebP => matches!(mode, L8 | La8 | Rgb8 | Rgba8),
        }
    }
}

impl Default for ContainerFormat {
    fn default() -> Self {
        ContainerFormat::Png
    }
}

/// Pixel layout of a decoded buffer
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelMode {
    L8,
    La8,
    Rgb8,
    Rgba8,
    L16,
    La16,
    Rgb16,
    Rgba16,
    Rgb32F,
    Rgba32F,
}

impl PixelMode {
    /// `None` for color types added to `image` after this mapping was written
    pub fn from_color_type(color: ColorType) -> Option<Self> {
        match color {
            ColorType::L8 => Some(PixelMode::L8),
            ColorType::La8 => Some(PixelMode::La8),
            ColorType::Rgb8 => Some(PixelMode::Rgb8),
            ColorType::Rgba8 => Some(PixelMode::Rgba8),
            ColorType::L16 => Some(PixelMode::L16),
            ColorType::La16 => Some(PixelMode::La16),
            ColorType::Rgb16 => Some(PixelMode::Rgb16),
            ColorType::Rgba16 => Some(PixelMode::Rgba16),
            ColorType::Rgb32F => Some(PixelMode::Rgb32F),
            ColorType::Rgba32F => Some(PixelMode::Rgba32F),
            _ => None,
        }
    }

    pub fn channel_count(self) -> u8 {
        match self {
            PixelMode::L8 | PixelMode::L16 => 1,
            PixelMode::La8 | PixelMode::La16 => 2,
            PixelMode::Rgb8 | PixelMode::Rgb16 | PixelMode::Rgb32F => 3,
            PixelMode::Rgba8 | PixelMode::Rgba16 | PixelMode::Rgba32F => 4,
        }
    }

    pub fn bits_per_pixel(self) -> u32 {
        let bits_per_channel = match self {
            PixelMode::L8 | PixelMode::La8 | PixelMode::Rgb8 | PixelMode::Rgba8 => 8,
            PixelMode::L16 | PixelMode::La16 | PixelMode::Rgb16 | PixelMode::Rgba16 => 16,
            PixelMode::Rgb32F | PixelMode::Rgba32F => 32,
        };
        bits_per_channel * u32::from(self.channel_count())
    }
}

impl fmt::Display for PixelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelMode::L8 => "L",
            PixelMode::La8 => "LA",
            PixelMode::Rgb8 => "RGB",
            PixelMode::Rgba8 => "RGBA",
            PixelMode::L16 => "I;16",
            PixelMode::La16 => "LA;16",
            PixelMode::Rgb16 => "RGB;16",
            PixelMode::Rgba16 => "RGBA;16",
            PixelMode::Rgb32F => "RGB;32F",
            PixelMode::Rgba32F => "RGBA;32F",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mode_has_a_container() {
        let modes = [
            PixelMode::L8,
            PixelMode::La8,
            PixelMode::Rgb8,
            PixelMode::Rgba8,
            PixelMode::L16,
            PixelMode::La16,
            PixelMode::Rgb16,
            PixelMode::Rgba16,
            PixelMode::Rgb32F,
            PixelMode::Rgba32F,
        ];
        for mode in modes {
            assert!(
                ContainerFormat::ALL.iter().any(|c| c.supports(mode)),
                "{mode} has no container"
            );
        }
    }

    #[test]
    fn test_jpeg_rejects_alpha() {
        assert!(ContainerFormat::Jpeg.supports(PixelMode::Rgb8));
        assert!(!ContainerFormat::Jpeg.supports(PixelMode::Rgba8));
        assert!(!ContainerFormat::Png.supports(PixelMode::Rgb32F));
    }

    #[test]
    fn test_format_mapping() {
        for container in ContainerFormat::ALL {
            let back = ContainerFormat::from_image_format(container.to_image_format());
            assert_eq!(back, Some(container));
        }
        assert_eq!(ContainerFormat::from_image_format(ImageFormat::Gif), None);
    }

    #[test]
    fn test_bits_per_pixel() {
        assert_eq!(PixelMode::Rgb8.bits_per_pixel(), 24);
        assert_eq!(PixelMode::La16.bits_per_pixel(), 32);
        assert_eq!(PixelMode::Rgba32F.bits_per_pixel(), 128);
        assert_eq!(PixelMode::from_color_type(ColorType::Rgba8), Some(PixelMode::Rgba8));
    }
}
