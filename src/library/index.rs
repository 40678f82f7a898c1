//! Persistent library index.
//!
//! The index is a JSON array of book records, kept in insertion order. It is
//! the only source of truth for "is this content already stored"; the store
//! directory is never scanned to answer that.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::{BookMetadata, BookRecord, Digest};
use crate::library::error::{LibraryError, LibraryResult};

/// File name of the persisted index inside the library root
pub const INDEX_FILE_NAME: &str = "library_index.json";

/// Ordered collection of book records, unique by digest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryIndex {
    records: Vec<BookRecord>,
}

impl LibraryIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from records, dropping later duplicates of a digest
    pub fn from_records(records: impl IntoIterator<Item = BookRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.append(record);
        }
        index
    }

    /// Add a record unless its digest is already present.
    ///
    /// Returns `true` if the record was inserted.
    pub fn append(&mut self, record: BookRecord) -> bool {
        if self.contains(&record.digest) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Whether a record with this digest exists
    pub fn contains(&self, digest: &Digest) -> bool {
        self.get(digest).is_some()
    }

    /// Get a record by digest
    pub fn get(&self, digest: &Digest) -> Option<&BookRecord> {
        self.records.iter().find(|r| &r.digest == digest)
    }

    /// Replace the metadata of an existing record
    pub fn update_metadata(
        &mut self,
        digest: &Digest,
        metadata: BookMetadata,
    ) -> LibraryResult<&BookRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| &r.digest == digest)
            .ok_or_else(|| LibraryError::UnknownDigest(digest.to_string()))?;

        record.metadata = metadata;
        Ok(record)
    }

    /// Records in insertion order
    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BookRecord> {
        self.records.iter()
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<BookRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a LibraryIndex {
    type Item = &'a BookRecord;
    type IntoIter = std::slice::Iter<'a, BookRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Location of the persisted index
#[derive(Debug, Clone)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The index file inside a library root
    pub fn in_root(root: &Path) -> Self {
        Self::new(root.join(INDEX_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the index, or an empty one if nothing has been saved yet
    pub fn load(&self) -> LibraryResult<LibraryIndex> {
        if !self.path.exists() {
            return Ok(LibraryIndex::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| LibraryError::io(&self.path, e))?;

        let records: Vec<BookRecord> =
            serde_json::from_str(&content).map_err(|e| LibraryError::CorruptIndex {
                path: self.path.clone(),
                source: e,
            })?;

        let loaded = records.len();
        let index = LibraryIndex::from_records(records);
        if index.len() < loaded {
            tracing::warn!(
                dropped = loaded - index.len(),
                "Duplicate digests in {}; keeping the first of each",
                self.path.display()
            );
        }

        Ok(index)
    }

    /// Write the full index, replacing the previous file via rename
    pub fn save(&self, index: &LibraryIndex) -> LibraryResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| LibraryError::io(&dir, e))?;

        let content = serde_json::to_string_pretty(index)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| LibraryError::io(&dir, e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| LibraryError::io(&self.path, e))?;
        if let Some(permissions) = self.target_permissions() {
            tmp.as_file()
                .set_permissions(permissions)
                .map_err(|e| LibraryError::io(&self.path, e))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| LibraryError::io(&self.path, e.error))?;

        Ok(())
    }

    /// Permissions for the saved file: those of the previous index, else the default
    fn target_permissions(&self) -> Option<fs::Permissions> {
        match fs::metadata(&self.path) {
            Ok(meta) => Some(meta.permissions()),
            Err(_) => default_permissions(),
        }
    }
}

/// Temp files are created owner-only; a fresh index is world-readable
#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}
