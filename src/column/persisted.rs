//! The on-disk form of one image cell
//!
//! A persisted cell is a record with exactly two fields, `bytes` and `path`.
//! It carries no type information of its own so that any structured-data
//! reader can load it.

use serde::{Deserialize, Serialize};

/// `{bytes, path}` record as stored by the host table
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PersistedCell {
    /// Encoded container bytes
    pub bytes: Option<Vec<u8>>,
    /// Provenance label, or a file to read when `bytes` is absent
    pub path: Option<String>,
}

impl PersistedCell {
    /// The record for a null cell
    pub fn null() -> Self {
        Self::default()
    }

    pub fn new(bytes: Option<Vec<u8>>, path: Option<String>) -> Self {
        Self { bytes, path }
    }

    /// Whether the record decodes to a null cell: no bytes and no usable path
    pub fn is_null(&self) -> bool {
        self.bytes.is_none() && self.path.as_deref().map_or(true, str::is_empty)
    }

    /// Convert to JSON for interchange (bytes as an integer array)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_detection() {
        assert!(PersistedCell::null().is_null());
        assert!(PersistedCell::new(None, Some(String::new())).is_null());
        assert!(!PersistedCell::new(Some(Vec::new()), None).is_null());
        assert!(!PersistedCell::new(None, Some("cat.png".into())).is_null());
        assert!(!PersistedCell::new(Some(vec![1]), None).is_null());
    }

    #[test]
    fn test_json_field_names() {
        let cell = PersistedCell::new(Some(vec![1, 2]), None);
        let json = cell.to_json().unwrap();
        assert_eq!(json, r#"{"bytes":[1,2],"path":null}"#);
        assert_eq!(PersistedCell::from_json(&json).unwrap(), cell);
    }
}
