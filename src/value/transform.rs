//! Pixel capabilities applied to boxed images
//!
//! This is a closed set: every operation a column can forward to its images
//! is a variant here, and the actual pixel work is done by the `image` crate.
//! Transforms are serializable so a pipeline can be stored as JSON next to
//! the data it produced.

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::codec::format::PixelMode;
use crate::error::{ImageError, Result};

/// Resampling filter used by resizes
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Clockwise rotation in quarter turns
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parse a clockwise angle in degrees; only multiples of 90 are accepted
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }
}

/// A pixel operation producing a new image from an existing one
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Transform {
    /// Exact resize, aspect ratio not preserved
    Resize {
        width: u32,
        height: u32,
        #[serde(default)]
        filter: ResizeFilter,
    },
    /// Fit within the bounds, preserving aspect ratio
    Thumbnail { max_width: u32, max_height: u32 },
    Rotate(Rotation),
    FlipHorizontal,
    FlipVertical,
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Convert(PixelMode),
    Grayscale,
    Blur { sigma: f32 },
    Brighten(i32),
    Contrast(f32),
    Invert,
}

impl Transform {
    pub fn resize(width: u32, height: u32) -> Self {
        Transform::Resize {
            width,
            height,
            filter: ResizeFilter::default(),
        }
    }

    /// Rotation by a clockwise angle in degrees (multiples of 90)
    pub fn rotate(degrees: i32) -> Result<Self> {
        Rotation::from_degrees(degrees)
            .map(Transform::Rotate)
            .ok_or_else(|| ImageError::InvalidTransform {
                message: format!("rotation by {degrees} degrees is not a quarter turn"),
            })
    }

    /// Run the transform on a buffer
    pub fn run(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let out = match self {
            Transform::Resize {
                width,
                height,
                filter,
            } => {
                check_nonzero(*width, *height)?;
                image.resize_exact(*width, *height, (*filter).into())
            }
            Transform::Thumbnail {
                max_width,
                max_height,
            } => {
                check_nonzero(*max_width, *max_height)?;
                image.thumbnail(*max_width, *max_height)
            }
            Transform::Rotate(Rotation::Deg90) => image.rotate90(),
            Transform::Rotate(Rotation::Deg180) => image.rotate180(),
            Transform::Rotate(Rotation::Deg270) => image.rotate270(),
            Transform::FlipHorizontal => image.fliph(),
            Transform::FlipVertical => image.flipv(),
            Transform::Crop {
                x,
                y,
                width,
                height,
            } => {
                let fits_x = x.checked_add(*width).is_some_and(|end| end <= image.width());
                let fits_y = y.checked_add(*height).is_some_and(|end| end <= image.height());
                if !fits_x || !fits_y || *width == 0 || *height == 0 {
                    return Err(ImageError::InvalidTransform {
                        message: format!(
                            "crop {width}x{height}+{x}+{y} outside {}x{} image",
                            image.width(),
                            image.height()
                        ),
                    });
                }
                image.crop_imm(*x, *y, *width, *height)
            }
            Transform::Convert(mode) => convert(image, *mode),
            Transform::Grayscale => image.grayscale(),
            Transform::Blur { sigma } => {
                if !sigma.is_finite() || *sigma <= 0.0 {
                    return Err(ImageError::InvalidTransform {
                        message: format!("blur sigma {sigma} must be a positive number"),
                    });
                }
                image.blur(*sigma)
            }
            Transform::Brighten(value) => image.brighten(*value),
            Transform::Contrast(value) => image.adjust_contrast(*value),
            Transform::Invert => {
                let mut inverted = image.clone();
                inverted.invert();
                inverted
            }
        };
        Ok(out)
    }
}

fn check_nonzero(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidTransform {
            message: format!("target size {width}x{height} is empty"),
        });
    }
    Ok(())
}

fn convert(image: &DynamicImage, mode: PixelMode) -> DynamicImage {
    match mode {
        PixelMode::L8 => DynamicImage::ImageLuma8(image.to_luma8()),
        PixelMode::La8 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        PixelMode::Rgb8 => DynamicImage::ImageRgb8(image.to_rgb8()),
        PixelMode::Rgba8 => DynamicImage::ImageRgba8(image.to_rgba8()),
        PixelMode::L16 => DynamicImage::ImageLuma16(image.to_luma16()),
        PixelMode::La16 => DynamicImage::ImageLumaA16(image.to_luma_alpha16()),
        PixelMode::Rgb16 => DynamicImage::ImageRgb16(image.to_rgb16()),
        PixelMode::Rgba16 => DynamicImage::ImageRgba16(image.to_rgba16()),
        PixelMode::Rgb32F => DynamicImage::ImageRgb32F(image.to_rgb32f()),
        PixelMode::Rgba32F => DynamicImage::ImageRgba32F(image.to_rgba32f()),
    }
}
