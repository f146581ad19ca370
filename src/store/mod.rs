//! Host-side persistence
//!
//! This module handles:
//! - Saving and loading columns in a SQLite table (sqlite.rs)
//! - Turning folders of image files into columns (scan.rs)

pub mod scan;
pub mod sqlite;

pub use sqlite::{ImageStore, StoreConfig};
