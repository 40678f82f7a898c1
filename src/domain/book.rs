//! Book records stored in the library index.
//!
//! A record is keyed by the SHA-256 digest of the file contents. The stored
//! path is a pure function of `(digest, format)`, see
//! [`BookRecord::relative_path`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::library::error::{LibraryError, LibraryResult};

/// Content digest (hex-encoded SHA-256 of the file bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Wrap an already computed hex digest.
    ///
    /// Hex is normalized to lowercase so lookups are case-insensitive.
    pub fn from_hex(hex: impl AsRef<str>) -> Self {
        Self(hex.as_ref().to_ascii_lowercase())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase file-extension token (`epub`, `pdf`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Format(String);

impl Format {
    pub const EPUB: &'static str = "epub";

    /// Derive the format from a file's extension.
    pub fn from_path(path: &Path) -> LibraryResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                LibraryError::InvalidInput(format!("File has no extension: {}", path.display()))
            })?;

        Ok(Self(ext.to_lowercase()))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the EPUB format
    pub fn is_epub(&self) -> bool {
        self.0 == Self::EPUB
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Format {
    type Err = LibraryError;

    fn from_str(s: &str) -> LibraryResult<Self> {
        let token = s.trim().trim_start_matches('.');
        if token.is_empty() {
            return Err(LibraryError::InvalidInput("Empty format".to_string()));
        }
        Ok(Self(token.to_lowercase()))
    }
}

/// Title and author of a book; either may be unknown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub author: Option<String>,
}

impl BookMetadata {
    pub fn new(title: Option<String>, author: Option<String>) -> Self {
        Self { title, author }
    }

    /// Metadata with neither title nor author
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.title.is_none() && self.author.is_none()
    }
}

/// One entry per distinct file content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Content digest, unique across the index
    #[serde(rename = "hash")]
    pub digest: Digest,

    /// Location of the file inside the store
    pub stored_path: PathBuf,

    /// Lowercase extension token
    pub format: Format,

    /// Extracted metadata
    #[serde(default)]
    pub metadata: BookMetadata,

    /// When the record was first added to the index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
}

impl BookRecord {
    /// Create a record for a file already placed in the store
    pub fn new(digest: Digest, stored_path: PathBuf, format: Format) -> Self {
        Self {
            digest,
            stored_path,
            format,
            metadata: BookMetadata::unknown(),
            imported_at: None,
        }
    }

    /// Set the metadata
    pub fn with_metadata(mut self, metadata: BookMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Stamp the import time
    pub fn with_imported_at(mut self, at: DateTime<Utc>) -> Self {
        self.imported_at = Some(at);
        self
    }

    /// `<format>/<digest>.<format>`, relative to the store root
    pub fn relative_path(digest: &Digest, format: &Format) -> PathBuf {
        PathBuf::from(format.as_str()).join(format!("{}.{}", digest, format))
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.title.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.metadata.author.as_deref()
    }
}
