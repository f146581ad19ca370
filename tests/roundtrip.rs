use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};
use imagecol::arrow::ipc::{read_ipc_file, write_ipc_file};
use imagecol::{ImageBox, ImageCodec, ImageColumn, ImageStore, ImageValue, PersistedCell, Transform};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([x as u8, y as u8, 128])
    }));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn scenario_column() -> ImageColumn {
    ImageColumn::from_values(vec![
        ImageValue::from(png_bytes(10, 10)),
        ImageValue::Null,
        ImageValue::from(b"corrupt_bytes".to_vec()),
    ])
}

#[test]
fn test_scenario_persist_then_open() {
    let codec = ImageCodec::default();
    let column = scenario_column();

    let records = column.to_persisted(&codec).unwrap();
    assert_eq!(records[0], PersistedCell::new(Some(png_bytes(10, 10)), Some(String::new())));
    assert_eq!(records[1], PersistedCell::new(None, None));
    assert_eq!(
        records[2],
        PersistedCell::new(Some(b"corrupt_bytes".to_vec()), Some(String::new()))
    );

    assert_eq!(column[0].size().unwrap(), Some((10, 10)));
    assert!(column[1].open().unwrap().is_none());
    assert!(column[2].open().unwrap_err().is_decode());
}

#[test]
fn test_untransformed_bytes_survive_every_backend() {
    let codec = ImageCodec::default();
    let column = scenario_column();
    let original = column.to_persisted(&codec).unwrap();

    // Arrow array
    let array = column.to_arrow(&codec).unwrap();
    let from_arrow = ImageColumn::try_from_arrow(&array, &codec).unwrap();
    assert_eq!(from_arrow.to_persisted(&codec).unwrap(), original);

    // Arrow IPC file
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("table.arrow");
    write_ipc_file(&path, &[("image", &column)], &codec).unwrap();
    let (_, from_ipc) = read_ipc_file(&path, &codec).unwrap().remove(0);
    assert_eq!(from_ipc.to_persisted(&codec).unwrap(), original);

    // SQLite table
    let mut store = ImageStore::open_in_memory().unwrap();
    store.save_column("image", &column, &codec).unwrap();
    let from_store = store.load_column("image", &codec).unwrap().unwrap();
    assert_eq!(from_store.to_persisted(&codec).unwrap(), original);
}

#[test]
fn test_transformed_cells_are_reencoded() {
    let codec = ImageCodec::default();
    let column = ImageColumn::from_values(vec![
        ImageValue::from(DynamicImage::ImageRgb8(RgbImage::new(10, 20))),
        ImageValue::Null,
    ]);

    let rotated = column.images().apply(&Transform::rotate(90).unwrap()).unwrap();
    let reloaded = ImageColumn::from_persisted(&codec, &rotated.to_persisted(&codec).unwrap());

    assert_eq!(reloaded[0].size().unwrap(), Some((20, 10)));
    assert!(reloaded[1].is_null());
    assert_eq!(column[0].size().unwrap(), Some((10, 20)));
}

#[test]
fn test_mixed_column_keeps_order_through_concat_and_take() {
    let a = ImageColumn::from_values(vec![ImageValue::from(png_bytes(1, 1)), ImageValue::Null]);
    let b = ImageColumn::from_values(vec![ImageValue::from(ImageBox::from_image(
        DynamicImage::ImageRgb8(RgbImage::new(3, 2)),
    ))]);

    let joined = a.concat(&b);
    let reordered = joined.take(&[Some(2), Some(0), None]).unwrap();
    assert_eq!(
        reordered.images().sizes().unwrap(),
        vec![Some((3, 2)), Some((1, 1)), None]
    );
}
