//! Arrow IPC files of image columns

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions};
use arrow_ipc::reader::FileReader;
use arrow_ipc::writer::FileWriter;
use arrow_schema::{Field, Schema};
use log::{debug, info};

use super::{has_image_storage, huggingface_metadata, image_field, is_image_field};
use crate::codec::ImageCodec;
use crate::column::ImageColumn;
use crate::error::{ImageError, Result};

/// Encode named image columns into one record batch
///
/// All columns must have the same length. The schema carries the image
/// extension tag on every field plus `datasets` feature metadata.
pub fn to_record_batch(
    columns: &[(&str, &ImageColumn)],
    codec: &ImageCodec,
) -> Result<RecordBatch> {
    let rows = columns.first().map_or(0, |(_, column)| column.len());
    if let Some((_, column)) = columns.iter().find(|(_, column)| column.len() != rows) {
        return Err(ImageError::LengthMismatch {
            expected: rows,
            found: column.len(),
        });
    }

    let fields: Vec<Field> = columns.iter().map(|(name, _)| image_field(name, true)).collect();
    let arrays = columns
        .iter()
        .map(|(_, column)| column.to_arrow(codec).map(|array| Arc::new(array) as ArrayRef))
        .collect::<Result<Vec<_>>>()?;

    let names = columns.iter().map(|(name, _)| *name);
    let schema = Schema::new(fields).with_metadata(huggingface_metadata(names));
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    Ok(RecordBatch::try_new_with_options(Arc::new(schema), arrays, &options)?)
}

/// Write named image columns to an Arrow IPC file
pub fn write_ipc_file(
    path: &Path,
    columns: &[(&str, &ImageColumn)],
    codec: &ImageCodec,
) -> Result<()> {
    let batch = to_record_batch(columns, codec)?;

    let file = File::create(path).map_err(|e| ImageError::io(path, e))?;
    let mut writer = FileWriter::try_new(BufWriter::new(file), &batch.schema())?;
    writer.write(&batch)?;
    writer.finish()?;

    info!(
        "wrote {} image column(s), {} rows to {}",
        batch.num_columns(),
        batch.num_rows(),
        path.display()
    );
    Ok(())
}

/// Read every image column from an Arrow IPC file
///
/// Columns are recognized by their extension tag or, for files written by
/// other tools, by the `{bytes, path}` struct shape. Other columns are
/// skipped. Batches are concatenated in file order.
pub fn read_ipc_file(path: &Path, codec: &ImageCodec) -> Result<Vec<(String, ImageColumn)>> {
    let file = File::open(path).map_err(|e| ImageError::io(path, e))?;
    let reader = FileReader::try_new(BufReader::new(file), None)?;

    let schema = reader.schema();
    let selected: Vec<(usize, String)> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| is_image_field(field) || has_image_storage(field.data_type()))
        .map(|(index, field)| (index, field.name().clone()))
        .collect();
    debug!(
        "{}: {} of {} columns hold images",
        path.display(),
        selected.len(),
        schema.fields().len()
    );

    let mut parts: Vec<Vec<ImageColumn>> = vec![Vec::new(); selected.len()];
    for batch in reader {
        let batch = batch?;
        for (slot, (index, _)) in selected.iter().enumerate() {
            parts[slot].push(ImageColumn::try_from_arrow(batch.column(*index).as_ref(), codec)?);
        }
    }

    Ok(selected
        .into_iter()
        .zip(parts)
        .map(|((_, name), parts)| (name, ImageColumn::concat_all(&parts)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ImageBox;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn test_length_mismatch() {
        let a = ImageColumn::empty(2);
        let b = ImageColumn::empty(3);
        let err = to_record_batch(&[("a", &a), ("b", &b)], &ImageCodec::default()).unwrap_err();
        assert!(matches!(err, ImageError::LengthMismatch { expected: 2, found: 3 }));
    }

    #[test]
    fn test_ipc_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("images.arrow");
        let codec = ImageCodec::default();

        let column: ImageColumn = vec![
            ImageBox::from_image(DynamicImage::ImageRgb8(RgbImage::new(10, 20))),
            ImageBox::Null,
        ]
        .into_iter()
        .collect();
        write_ipc_file(&path, &[("image", &column)], &codec).unwrap();

        let columns = read_ipc_file(&path, &codec).unwrap();
        assert_eq!(columns.len(), 1);
        let (name, loaded) = &columns[0];
        assert_eq!(name, "image");
        assert_eq!(loaded.is_null_mask(), vec![false, true]);
        assert_eq!(loaded[0].size().unwrap(), Some((10, 20)));
    }

    #[test]
    fn test_missing_file() {
        let err = read_ipc_file(Path::new("/nonexistent/images.arrow"), &ImageCodec::default())
            .unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
    }
}
