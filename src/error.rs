//! Error types for image columns
//!
//! Every fallible operation in the crate returns [`Result`]. Construction
//! errors surface immediately; decode errors surface only when a cell's
//! pixels are actually needed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::format::ContainerFormat;

/// Result type for image column operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur while building, encoding or materializing images.
#[derive(Debug, Error)]
pub enum ImageError {
    /// A construction input was not bytes, a path, an image, a cell or null.
    #[error("cannot build an image column from {found}")]
    Type { found: String },

    /// Bytes did not yield a recognized, valid image container.
    #[error("corrupt image payload{}: {source}", label_suffix(.label))]
    Decode {
        label: Option<String>,
        #[source]
        source: image::ImageError,
    },

    /// No configured output container can store this pixel mode.
    #[error("no output container can store pixel mode {mode}")]
    UnsupportedBuffer { mode: String },

    /// The chosen container failed to serialize a decoded buffer.
    #[error("failed to encode image as {format:?}: {source}")]
    Encode {
        format: ContainerFormat,
        #[source]
        source: image::ImageError,
    },

    /// A referenced file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Positional access past the end of a column.
    #[error("index {index} out of bounds for column of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Columns that must line up have different lengths.
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// A transform's parameters do not fit the image.
    #[error("invalid transform: {message}")]
    InvalidTransform { message: String },

    /// Arrow array or IPC failure.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// SQLite store failure.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

fn label_suffix(label: &Option<String>) -> String {
    match label {
        Some(label) if !label.is_empty() => format!(" in {label}"),
        _ => String::new(),
    }
}

impl ImageError {
    /// True for the lazily raised corrupt-payload error.
    pub fn is_decode(&self) -> bool {
        matches!(self, ImageError::Decode { .. })
    }

    pub(crate) fn type_error(found: impl Into<String>) -> Self {
        ImageError::Type {
            found: found.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ImageError::Io {
            path: path.into(),
            source,
        }
    }
}
