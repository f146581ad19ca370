//! Image columns
//!
//! This module handles:
//! - The column type itself and its positional operations (mod.rs)
//! - Normalizing mixed inputs into boxes (coerce.rs)
//! - The `{bytes, path}` record a column persists to (persisted.rs)
//!
//! Operations return new columns; the only in-place mutation is
//! [`ImageColumn::set`], which swaps a single cell's box.

pub mod coerce;
pub mod persisted;

use std::ops::Index;

use serde_json::Value;

use self::coerce::ImageValue;
use self::persisted::PersistedCell;
use crate::arrow::IMAGE_EXTENSION_NAME;
use crate::codec::ImageCodec;
use crate::error::{ImageError, Result};
use crate::value::{EncodedSource, ImageBox};

/// An ordered, nullable sequence of images
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageColumn {
    values: Vec<ImageBox>,
}

impl ImageColumn {
    pub fn new(values: Vec<ImageBox>) -> Self {
        Self { values }
    }

    /// Build a column from bytes, paths, boxes, persisted cells or nulls
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ImageValue>,
    {
        Self::from_values_with_codec(values, &ImageCodec::default())
    }

    pub fn from_values_with_codec<I, V>(values: I, codec: &ImageCodec) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ImageValue>,
    {
        values
            .into_iter()
            .map(|value| value.into().into_box(codec))
            .collect()
    }

    /// Build a column from loosely typed JSON values
    ///
    /// Accepts `null`, strings (paths), arrays of byte values, and objects
    /// with exactly the `bytes` and `path` keys. Any other shape fails the
    /// whole construction.
    pub fn try_from_json(values: &[Value], codec: &ImageCodec) -> Result<Self> {
        let values = values
            .iter()
            .map(json_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_values_with_codec(values, codec))
    }

    /// A column of `len` nulls
    pub fn empty(len: usize) -> Self {
        Self {
            values: vec![ImageBox::Null; len],
        }
    }

    /// Logical type tag advertised to the host table
    pub fn logical_type() -> &'static str {
        IMAGE_EXTENSION_NAME
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageBox> {
        self.values.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ImageBox> {
        self.values.get(index)
    }

    pub fn boxes(&self) -> &[ImageBox] {
        &self.values
    }

    pub fn into_boxes(self) -> Vec<ImageBox> {
        self.values
    }

    /// Replace one cell in place
    pub fn set(&mut self, index: usize, value: impl Into<ImageValue>) -> Result<()> {
        self.set_with_codec(index, value, &ImageCodec::default())
    }

    pub fn set_with_codec(
        &mut self,
        index: usize,
        value: impl Into<ImageValue>,
        codec: &ImageCodec,
    ) -> Result<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(ImageError::IndexOutOfBounds { index, len })?;
        *slot = value.into().into_box(codec);
        Ok(())
    }

    /// Copy of this column with `replacement` written over `start..`
    pub fn set_slice(&self, start: usize, replacement: &ImageColumn) -> Result<ImageColumn> {
        let end = start
            .checked_add(replacement.len())
            .filter(|end| *end <= self.len())
            .ok_or(ImageError::IndexOutOfBounds {
                index: start.saturating_add(replacement.len()),
                len: self.len(),
            })?;

        let mut values = self.values.clone();
        values[start..end].clone_from_slice(&replacement.values);
        Ok(Self { values })
    }

    pub fn slice(&self, offset: usize, len: usize) -> Result<ImageColumn> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.len())
            .ok_or(ImageError::IndexOutOfBounds {
                index: offset.saturating_add(len),
                len: self.len(),
            })?;
        Ok(Self {
            values: self.values[offset..end].to_vec(),
        })
    }

    pub fn concat(&self, other: &ImageColumn) -> ImageColumn {
        Self::concat_all([self, other])
    }

    pub fn concat_all<'a>(columns: impl IntoIterator<Item = &'a ImageColumn>) -> ImageColumn {
        columns
            .into_iter()
            .flat_map(|column| column.values.iter().cloned())
            .collect()
    }

    /// Gather cells by position; `None` positions become nulls
    pub fn take(&self, indices: &[Option<usize>]) -> Result<ImageColumn> {
        indices
            .iter()
            .map(|index| match index {
                None => Ok(ImageBox::Null),
                Some(i) => self.values.get(*i).cloned().ok_or(ImageError::IndexOutOfBounds {
                    index: *i,
                    len: self.len(),
                }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn is_null_mask(&self) -> Vec<bool> {
        self.values.iter().map(ImageBox::is_null).collect()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// In-memory footprint: encoded payloads plus any decoded pixels
    pub fn nbytes(&self) -> usize {
        self.values
            .iter()
            .map(|value| match value {
                ImageBox::Null => 0,
                ImageBox::Decoded(decoded) => decoded.byte_len(),
                ImageBox::Encoded(encoded) => {
                    let payload = match encoded.source() {
                        EncodedSource::Bytes { data, .. } => data.len(),
                        EncodedSource::File(_) => 0,
                    };
                    let pixels = if encoded.is_materialized() {
                        encoded.open().map_or(0, |d| d.byte_len())
                    } else {
                        0
                    };
                    payload + pixels
                }
            })
            .sum()
    }

    /// Serialization hook: encode every cell
    pub fn to_persisted(&self, codec: &ImageCodec) -> Result<Vec<PersistedCell>> {
        self.values.iter().map(|value| codec.encode(value)).collect()
    }

    /// Deserialization hook: wrap every record in a lazy box
    pub fn from_persisted(codec: &ImageCodec, records: &[PersistedCell]) -> ImageColumn {
        records.iter().map(|record| codec.decode(record)).collect()
    }
}

fn json_value(value: &Value) -> Result<ImageValue> {
    match value {
        Value::Null => Ok(ImageValue::Null),
        Value::String(path) => Ok(ImageValue::from(path.as_str())),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|byte| u8::try_from(byte).ok())
                    .ok_or_else(|| ImageError::type_error(format!("byte array element {item}")))
            })
            .collect::<Result<Vec<u8>>>()
            .map(ImageValue::Bytes),
        Value::Object(map)
            if map.len() == 2 && map.contains_key("bytes") && map.contains_key("path") =>
        {
            serde_json::from_value::<PersistedCell>(value.clone())
                .map(ImageValue::Cell)
                .map_err(|e| ImageError::type_error(format!("malformed persisted cell ({e})")))
        }
        Value::Object(_) => Err(ImageError::type_error(
            "an object without exactly `bytes` and `path`",
        )),
        Value::Bool(_) => Err(ImageError::type_error("a boolean")),
        Value::Number(_) => Err(ImageError::type_error("a number")),
    }
}

impl FromIterator<ImageBox> for ImageColumn {
    fn from_iter<T: IntoIterator<Item = ImageBox>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ImageColumn {
    type Item = &'a ImageBox;
    type IntoIter = std::slice::Iter<'a, ImageBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl IntoIterator for ImageColumn {
    type Item = ImageBox;
    type IntoIter = std::vec::IntoIter<ImageBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl Index<usize> for ImageColumn {
    type Output = ImageBox;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}
