//! Image-valued table columns
//!
//! Lets a table column hold embedded images instead of file paths, and
//! persist them to columnar storage without losing pixel data.
//!
//! - [`ImageBox`]: one cell, lazily decoded and memoized
//! - [`ImageColumn`]: an ordered, nullable sequence of cells
//! - [`ImageCodec`]: conversion to and from the `{bytes, path}` record
//! - [`arrow`]: extension-typed Arrow arrays and IPC files
//! - [`store`]: a SQLite host table and folder scanning
//!
//! ```no_run
//! use imagecol::{ImageCodec, ImageColumn, ImageValue};
//!
//! # fn main() -> imagecol::Result<()> {
//! let png = std::fs::read("cat.png").unwrap();
//! let column = ImageColumn::from_values(vec![ImageValue::from(png), ImageValue::Null]);
//!
//! let codec = ImageCodec::default();
//! let array = column.to_arrow(&codec)?;
//! let reloaded = ImageColumn::try_from_arrow(&array, &codec)?;
//! let rotated = reloaded.images().rotate(90)?;
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod arrow;
pub mod codec;
pub mod column;
pub mod error;
pub mod store;
pub mod value;

pub use accessor::{html_formatter, ImageMethods};
pub use codec::format::{ContainerFormat, PixelMode};
pub use codec::{CodecConfig, ImageCodec};
pub use column::coerce::ImageValue;
pub use column::persisted::PersistedCell;
pub use column::ImageColumn;
pub use error::{ImageError, Result};
pub use store::{ImageStore, StoreConfig};
pub use value::{DecodedImage, ImageBox, ResizeFilter, Rotation, Transform};
