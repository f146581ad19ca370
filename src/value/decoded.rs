//! Decoded pixel buffers with their metadata

use image::DynamicImage;

use crate::codec::format::{ContainerFormat, PixelMode};

/// An addressable pixel buffer owned by exactly one box
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    image: DynamicImage,
    /// Container the pixels were decoded from (None after a transform)
    source_format: Option<ContainerFormat>,
    /// Provenance label, usually the original filename
    label: Option<String>,
}

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            source_format: None,
            label: None,
        }
    }

    pub fn with_source_format(mut self, format: Option<ContainerFormat>) -> Self {
        self.source_format = format;
        self
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel mode of the buffer, `None` for color types without a mapping
    pub fn mode(&self) -> Option<PixelMode> {
        PixelMode::from_color_type(self.image.color())
    }

    pub fn source_format(&self) -> Option<ContainerFormat> {
        self.source_format
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    /// Size of the raw pixel buffer in bytes
    pub fn byte_len(&self) -> usize {
        self.image.as_bytes().len()
    }
}

impl From<DynamicImage> for DecodedImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}
