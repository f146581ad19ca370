//! Arrow representation of image columns
//!
//! An image column is stored as a `Struct<bytes: Binary, path: Utf8>` array.
//! The image logical type travels only in the field's extension metadata, so
//! readers that know nothing about it still see a plain struct of bytes and
//! strings.
//!
//! - `image_field`: field with the extension tag attached
//! - `ImageColumn::to_arrow` / `ImageColumn::try_from_arrow`: array conversion
//! - `huggingface_metadata`: schema metadata understood by `datasets`

pub mod ipc;

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, BinaryArray, StringArray, StructArray};
use arrow_buffer::NullBuffer;
use arrow_schema::{DataType, Field, Fields};
use serde_json::{json, Map, Value};

use crate::codec::ImageCodec;
use crate::column::coerce::ImageValue;
use crate::column::persisted::PersistedCell;
use crate::column::ImageColumn;
use crate::error::{ImageError, Result};

/// Extension name advertised for image columns
pub const IMAGE_EXTENSION_NAME: &str = "imagecol.image";

/// Field metadata key holding the extension name
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// Field metadata key holding the (empty) extension metadata
pub const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

/// Schema metadata key read by Hugging Face `datasets`
pub const HUGGINGFACE_METADATA_KEY: &str = "huggingface";

/// Children of the storage struct
pub fn storage_fields() -> Fields {
    Fields::from(vec![
        Field::new("bytes", DataType::Binary, true),
        Field::new("path", DataType::Utf8, true),
    ])
}

/// Storage type of an image column
pub fn storage_type() -> DataType {
    DataType::Struct(storage_fields())
}

/// A field carrying the image extension tag
pub fn image_field(name: &str, nullable: bool) -> Field {
    Field::new(name, storage_type(), nullable).with_metadata(HashMap::from([
        (EXTENSION_NAME_KEY.to_string(), IMAGE_EXTENSION_NAME.to_string()),
        (EXTENSION_METADATA_KEY.to_string(), String::new()),
    ]))
}

/// Whether a field is tagged as an image column
pub fn is_image_field(field: &Field) -> bool {
    field
        .metadata()
        .get(EXTENSION_NAME_KEY)
        .is_some_and(|name| name == IMAGE_EXTENSION_NAME)
}

/// Whether a type has the `{bytes, path}` struct shape, tagged or not
pub fn has_image_storage(data_type: &DataType) -> bool {
    let DataType::Struct(fields) = data_type else {
        return false;
    };
    let names: Vec<&str> = fields.iter().map(|f| f.name().as_str()).collect();
    fields.len() == 2 && names.contains(&"bytes") && names.contains(&"path")
}

/// Schema metadata declaring the named columns as `datasets` Image features
pub fn huggingface_metadata<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> HashMap<String, String> {
    let features: Map<String, Value> = names
        .into_iter()
        .map(|name| (name.to_string(), json!({ "_type": "Image" })))
        .collect();
    let info = json!({ "info": { "features": features } });
    HashMap::from([(HUGGINGFACE_METADATA_KEY.to_string(), info.to_string())])
}

impl ImageColumn {
    /// Encode every cell into the storage struct array
    pub fn to_arrow(&self, codec: &ImageCodec) -> Result<StructArray> {
        let cells = self.to_persisted(codec)?;

        let bytes: BinaryArray = cells.iter().map(|c| c.bytes.as_deref()).collect();
        let paths: StringArray = cells.iter().map(|c| c.path.as_deref()).collect();
        let validity = NullBuffer::from(cells.iter().map(|c| !c.is_null()).collect::<Vec<bool>>());

        let array = StructArray::try_new(
            storage_fields(),
            vec![Arc::new(bytes) as ArrayRef, Arc::new(paths) as ArrayRef],
            Some(validity),
        )?;
        Ok(array)
    }

    /// Build a column from an Arrow array
    ///
    /// Binary arrays are raw bytes, string arrays are paths, and
    /// `{bytes, path}` structs are persisted cells. Any other type is
    /// rejected before a single cell is built.
    pub fn try_from_arrow(array: &dyn Array, codec: &ImageCodec) -> Result<Self> {
        let values: Vec<ImageValue> = match array.data_type() {
            DataType::Null => vec![ImageValue::Null; array.len()],
            DataType::Binary => values_of(array.as_binary::<i32>().iter()),
            DataType::LargeBinary => values_of(array.as_binary::<i64>().iter()),
            DataType::BinaryView => values_of(array.as_binary_view().iter()),
            DataType::Utf8 => values_of(array.as_string::<i32>().iter()),
            DataType::LargeUtf8 => values_of(array.as_string::<i64>().iter()),
            DataType::Utf8View => values_of(array.as_string_view().iter()),
            DataType::Struct(_) => struct_values(array.as_struct())?,
            other => return Err(ImageError::type_error(format!("arrow type {other}"))),
        };
        Ok(Self::from_values_with_codec(values, codec))
    }
}

fn values_of<T: Into<ImageValue>>(iter: impl Iterator<Item = Option<T>>) -> Vec<ImageValue> {
    iter.map(ImageValue::from).collect()
}

fn struct_values(array: &StructArray) -> Result<Vec<ImageValue>> {
    if !has_image_storage(array.data_type()) {
        return Err(ImageError::type_error(format!(
            "struct {} (expected exactly `bytes` and `path`)",
            array.data_type()
        )));
    }
    // Both children exist after the shape check
    let (Some(bytes), Some(paths)) = (array.column_by_name("bytes"), array.column_by_name("path"))
    else {
        return Err(ImageError::type_error("struct without `bytes` and `path` children"));
    };

    let bytes = byte_cells(bytes)?;
    let paths = path_cells(paths)?;
    Ok(bytes
        .into_iter()
        .zip(paths)
        .enumerate()
        .map(|(i, (bytes, path))| {
            if array.is_null(i) {
                ImageValue::Null
            } else {
                ImageValue::Cell(PersistedCell::new(bytes, path))
            }
        })
        .collect())
}

fn byte_cells(array: &ArrayRef) -> Result<Vec<Option<Vec<u8>>>> {
    let owned = |v: Option<&[u8]>| v.map(<[u8]>::to_vec);
    Ok(match array.data_type() {
        DataType::Null => vec![None; array.len()],
        DataType::Binary => array.as_binary::<i32>().iter().map(owned).collect(),
        DataType::LargeBinary => array.as_binary::<i64>().iter().map(owned).collect(),
        DataType::BinaryView => array.as_binary_view().iter().map(owned).collect(),
        other => return Err(ImageError::type_error(format!("`bytes` child of type {other}"))),
    })
}

fn path_cells(array: &ArrayRef) -> Result<Vec<Option<String>>> {
    let owned = |v: Option<&str>| v.map(str::to_string);
    Ok(match array.data_type() {
        DataType::Null => vec![None; array.len()],
        DataType::Utf8 => array.as_string::<i32>().iter().map(owned).collect(),
        DataType::LargeUtf8 => array.as_string::<i64>().iter().map(owned).collect(),
        DataType::Utf8View => array.as_string_view().iter().map(owned).collect(),
        other => return Err(ImageError::type_error(format!("`path` child of type {other}"))),
    })
}
