//! Video catalog: human-friendly titles for stored objects.
//!
//! Objects in the blob store carry storage names like `a1b2c3.mp4`. The
//! catalog maps a display name, per bucket, to that storage name so users can
//! ask for "Intro lecture" instead. It is a local file consumed by client
//! commands; the relay protocol never sees display names.
//!
//! The file is TOML:
//!
//! ```toml
//! [[videos]]
//! bucket = "demo"
//! storage_name = "sample.mp4"
//! display_name = "Sample clip"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading, saving, or editing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading or writing the catalog file.
    #[error("catalog IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog file is not valid TOML.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    /// The catalog could not be serialized.
    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An entry with the same bucket and storage or display name exists.
    #[error("duplicate catalog entry in bucket `{bucket}`: {name}")]
    Duplicate { bucket: String, name: String },

    /// An entry field is empty.
    #[error("catalog entry field `{field}` must not be empty")]
    EmptyField { field: &'static str },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// One catalogued video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Bucket holding the object.
    pub bucket: String,
    /// Object name in the blob store.
    pub storage_name: String,
    /// Title shown to users.
    pub display_name: String,
}

impl CatalogEntry {
    /// Creates a new entry.
    pub fn new(
        bucket: impl Into<String>,
        storage_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            storage_name: storage_name.into(),
            display_name: display_name.into(),
        }
    }
}

/// The set of catalogued videos, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "videos")]
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a catalog file. A missing file is an empty catalog.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the catalog, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> CatalogResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Adds an entry.
    ///
    /// Within a bucket, both the storage name and the display name must be
    /// unique.
    pub fn add(&mut self, entry: CatalogEntry) -> CatalogResult<()> {
        for (field, value) in [
            ("bucket", &entry.bucket),
            ("storage_name", &entry.storage_name),
            ("display_name", &entry.display_name),
        ] {
            if value.trim().is_empty() {
                return Err(CatalogError::EmptyField { field });
            }
        }

        if let Some(existing) = self.entries.iter().find(|e| {
            e.bucket == entry.bucket
                && (e.storage_name == entry.storage_name || e.display_name == entry.display_name)
        }) {
            let name = if existing.storage_name == entry.storage_name {
                existing.storage_name.clone()
            } else {
                existing.display_name.clone()
            };
            return Err(CatalogError::Duplicate {
                bucket: entry.bucket,
                name,
            });
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Returns the storage name for `display_name` in `bucket`.
    pub fn lookup_storage_name(&self, display_name: &str, bucket: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.bucket == bucket && e.display_name == display_name)
            .map(|e| e.storage_name.as_str())
    }

    /// Returns every display name in `bucket`, in insertion order.
    pub fn list_display_names(&self, bucket: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.bucket == bucket)
            .map(|e| e.display_name.as_str())
            .collect()
    }
}
