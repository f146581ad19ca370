//! Folder scanning
//!
//! Walks a directory tree and collects image files by extension, so a whole
//! folder can become a column of lazy file references.

use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::codec::format::ContainerFormat;
use crate::column::ImageColumn;
use crate::value::ImageBox;

/// Extensions readable by the decoder but never written by the codec
const EXTRA_EXTENSIONS: [&str; 4] = ["gif", "tga", "qoi", "ico"];

/// Check if a path looks like an image by its extension
pub fn is_image_path(path: &Path) -> bool {
    let Some(extension) = path.extension() else {
        return false;
    };
    let ext = extension.to_string_lossy().to_lowercase();
    ContainerFormat::ALL
        .iter()
        .flat_map(|format| format.extensions())
        .chain(EXTRA_EXTENSIONS.iter())
        .any(|known| *known == ext)
}

/// Recursively collect image files under `folder`, sorted by path
pub fn scan_image_paths(folder: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && is_image_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    debug!("found {} image files under {}", paths.len(), folder.display());
    paths
}

impl ImageColumn {
    /// A column of file references, one per image under `folder`.
    /// Files are not read until a cell is opened or encoded.
    pub fn from_directory(folder: &Path) -> ImageColumn {
        scan_image_paths(folder)
            .into_iter()
            .map(ImageBox::from_path)
            .collect()
    }
}
