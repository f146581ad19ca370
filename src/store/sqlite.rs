use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codec::ImageCodec;
use crate::column::persisted::PersistedCell;
use crate::column::ImageColumn;
use crate::error::{ImageError, Result};

/// Where the SQLite column store lives
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Path to the database file
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    /// The database file is created in the user's data directory:
    /// - Linux: ~/.local/share/imagecol/images.db
    /// - macOS: ~/Library/Application Support/imagecol/images.db
    /// - Windows: %APPDATA%\imagecol\images.db
    fn default() -> Self {
        let mut db_path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        db_path.push("imagecol");
        db_path.push("images.db");
        Self { db_path }
    }
}

/// A host table backed by SQLite.
/// Each image column is a set of rows holding the persisted `{bytes, path}` cells.
pub struct ImageStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl ImageStore {
    /// Open (or create) the store described by `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ImageError::io(parent, e))?;
            }
        }

        let conn = Connection::open(&config.db_path)?;
        info!("image store opened at {}", config.db_path.display());

        let store = ImageStore {
            conn,
            db_path: Some(config.db_path.clone()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// A throwaway store, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let store = ImageStore {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create the cells table and its index if they don't exist
    fn init_schema(&self) -> Result<()> {
        // bytes/path mirror the persisted cell; both NULL means a null cell
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS image_cells (
                column_name     TEXT NOT NULL,
                position        INTEGER NOT NULL,
                bytes           BLOB,
                path            TEXT,
                stored_at       INTEGER NOT NULL,
                PRIMARY KEY (column_name, position)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_image_cells_stored_at
             ON image_cells(stored_at DESC)",
            [],
        )?;

        debug!("image store schema initialized");
        Ok(())
    }

    /// Path to the database file (None for in-memory stores)
    pub fn path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Persist a column under `name`, replacing any previous contents.
    /// Encoding happens before the write so a failing cell leaves the old column intact.
    pub fn save_column(
        &mut self,
        name: &str,
        column: &ImageColumn,
        codec: &ImageCodec,
    ) -> Result<()> {
        let cells = column.to_persisted(codec)?;
        let now = Utc::now().timestamp();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM image_cells WHERE column_name = ?1", params![name])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO image_cells (column_name, position, bytes, path, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, cell) in cells.iter().enumerate() {
                stmt.execute(params![name, position as i64, cell.bytes, cell.path, now])?;
            }
        }
        tx.commit()?;

        info!("saved column {} ({} cells)", name, cells.len());
        Ok(())
    }

    /// Load a column by name; cells stay encoded until opened.
    /// Returns None when no cells are stored under `name`.
    pub fn load_column(&self, name: &str, codec: &ImageCodec) -> Result<Option<ImageColumn>> {
        if self.cell_count(name)?.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT bytes, path FROM image_cells WHERE column_name = ?1 ORDER BY position",
        )?;
        let cells = stmt
            .query_map(params![name], |row| {
                Ok(PersistedCell::new(row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(ImageColumn::from_persisted(codec, &cells)))
    }

    /// Number of cells stored for a column, None if there are none
    pub fn cell_count(&self, name: &str) -> Result<Option<usize>> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM image_cells WHERE column_name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok((count > 0).then_some(count as usize))
    }

    /// Names of all stored columns, alphabetically
    pub fn column_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT column_name FROM image_cells ORDER BY column_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Timestamp (unix seconds) of a column's last save
    pub fn stored_at(&self, name: &str) -> Result<Option<i64>> {
        let stored_at = self
            .conn
            .query_row(
                "SELECT MAX(stored_at) FROM image_cells WHERE column_name = ?1",
                params![name],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        Ok(stored_at)
    }

    /// Remove a column; returns the number of deleted cells
    pub fn delete_column(&self, name: &str) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM image_cells WHERE column_name = ?1", params![name])?;
        if deleted > 0 {
            info!("deleted column {} ({} cells)", name, deleted);
        }
        Ok(deleted)
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ImageBox;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn sample_column() -> ImageColumn {
        vec![
            ImageBox::from_bytes_with_label(png_bytes(), "cat.png"),
            ImageBox::Null,
            ImageBox::from_bytes(b"corrupt_bytes".to_vec()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_save_and_load() {
        let codec = ImageCodec::default();
        let mut store = ImageStore::open_in_memory().unwrap();
        let column = sample_column();

        store.save_column("image", &column, &codec).unwrap();
        assert_eq!(store.cell_count("image").unwrap(), Some(3));
        assert!(store.stored_at("image").unwrap().is_some());

        let loaded = store.load_column("image", &codec).unwrap().unwrap();
        assert_eq!(loaded, column);
        assert_eq!(loaded[0].label(), Some("cat.png"));
        assert!(loaded[2].open().unwrap_err().is_decode());
    }

    #[test]
    fn test_save_replaces_previous_column() {
        let codec = ImageCodec::default();
        let mut store = ImageStore::open_in_memory().unwrap();
        store.save_column("image", &sample_column(), &codec).unwrap();
        store.save_column("image", &ImageColumn::empty(1), &codec).unwrap();

        let loaded = store.load_column("image", &codec).unwrap().unwrap();
        assert_eq!(loaded.is_null_mask(), vec![true]);
    }

    #[test]
    fn test_column_listing_and_delete() {
        let codec = ImageCodec::default();
        let mut store = ImageStore::open_in_memory().unwrap();
        store.save_column("b", &sample_column(), &codec).unwrap();
        store.save_column("a", &sample_column(), &codec).unwrap();
        assert_eq!(store.column_names().unwrap(), vec!["a", "b"]);

        assert_eq!(store.delete_column("a").unwrap(), 3);
        assert!(store.load_column("a", &codec).unwrap().is_none());
        assert_eq!(store.cell_count("a").unwrap(), None);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            db_path: dir.path().join("nested").join("images.db"),
        };
        let codec = ImageCodec::default();
        {
            let mut store = ImageStore::open(&config).unwrap();
            store.save_column("image", &sample_column(), &codec).unwrap();
        }
        let store = ImageStore::open(&config).unwrap();
        assert_eq!(store.path(), Some(&config.db_path));
        assert_eq!(store.load_column("image", &codec).unwrap().unwrap().len(), 3);
    }
}
