//! Conversion between boxed images and persisted cells
//!
//! Encoding never decodes: boxes that still carry their original bytes are
//! written back untouched, so storing and reloading a column causes no
//! generation loss. Only decoded buffers (fresh images or transform results)
//! are compressed, into a container picked from the codec configuration.

pub mod format;

use std::fs;
use std::io::Cursor;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use self::format::{ContainerFormat, PixelMode};
use crate::column::persisted::PersistedCell;
use crate::error::{ImageError, Result};
use crate::value::{DecodedImage, EncodedSource, ImageBox};

/// Codec settings, passed explicitly to every encode
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CodecConfig {
    /// Container for decoded buffers whose source format is unknown
    pub default_container: ContainerFormat,

    /// Tried when the default container cannot store the pixel mode
    pub fallback_container: Option<ContainerFormat>,

    /// Re-use the container a buffer was decoded from, when it can store the mode
    pub preserve_source_format: bool,

    /// Read path-referenced files into the cell's bytes on encode
    /// - true: cells are self-contained
    /// - false: cells keep only the path
    pub embed_referenced_files: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            default_container: ContainerFormat::Png,
            fallback_container: Some(ContainerFormat::Tiff),
            preserve_source_format: true,
            embed_referenced_files: true,
        }
    }
}

impl CodecConfig {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Encodes boxes to `{bytes, path}` records and decodes them back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCodec {
    config: CodecConfig,
}

impl ImageCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Pick the container a decoded buffer is written to
    pub fn choose_container(
        &self,
        mode: PixelMode,
        source: Option<ContainerFormat>,
    ) -> Result<ContainerFormat> {
        let preserved = source.filter(|_| self.config.preserve_source_format);
        [preserved, Some(self.config.default_container), self.config.fallback_container]
            .into_iter()
            .flatten()
            .find(|container| container.supports(mode))
            .ok_or_else(|| ImageError::UnsupportedBuffer {
                mode: mode.to_string(),
            })
    }

    /// Turn a box into its persisted record
    pub fn encode(&self, image: &ImageBox) -> Result<PersistedCell> {
        match image {
            ImageBox::Null => Ok(PersistedCell::null()),
            ImageBox::Encoded(encoded) => match encoded.source() {
                EncodedSource::Bytes { data, label } => Ok(PersistedCell::new(
                    Some(data.clone()),
                    Some(label.clone().unwrap_or_default()),
                )),
                EncodedSource::File(path) => {
                    let label = path.to_string_lossy().into_owned();
                    if !self.config.embed_referenced_files {
                        return Ok(PersistedCell::new(None, Some(label)));
                    }
                    let data = fs::read(path).map_err(|e| ImageError::io(path, e))?;
                    debug!("embedded {} ({} bytes)", path.display(), data.len());
                    Ok(PersistedCell::new(Some(data), Some(label)))
                }
            },
            ImageBox::Decoded(decoded) => self.encode_decoded(decoded),
        }
    }

    fn encode_decoded(&self, decoded: &DecodedImage) -> Result<PersistedCell> {
        let mode = decoded.mode().ok_or_else(|| ImageError::UnsupportedBuffer {
            mode: format!("{:?}", decoded.image().color()),
        })?;
        let container = self.choose_container(mode, decoded.source_format())?;

        let mut out = Cursor::new(Vec::new());
        decoded
            .image()
            .write_to(&mut out, container.to_image_format())
            .map_err(|source| {
                warn!("failed to encode {mode} buffer as {container:?}: {source}");
                ImageError::Encode {
                    format: container,
                    source,
                }
            })?;

        let data = out.into_inner();
        debug!(
            "encoded {}x{} {} buffer as {:?} ({} bytes)",
            decoded.width(),
            decoded.height(),
            mode,
            container,
            data.len()
        );
        Ok(PersistedCell::new(
            Some(data),
            Some(decoded.label().unwrap_or_default().to_string()),
        ))
    }

    /// Turn a persisted record into a lazy box; never decodes pixels
    pub fn decode(&self, cell: &PersistedCell) -> ImageBox {
        let path = cell.path.as_deref().filter(|p| !p.is_empty());
        match (&cell.bytes, path) {
            (Some(data), Some(label)) if !data.is_empty() => {
                ImageBox::from_bytes_with_label(data.clone(), label)
            }
            // Empty bytes fall back to the referenced file
            (_, Some(path)) => ImageBox::from_path(path),
            // Nothing to fall back to: keep the empty payload so opening fails
            (Some(data), None) => ImageBox::from_bytes(data.clone()),
            (None, None) => ImageBox::Null,
        }
    }
}
