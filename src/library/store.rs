//! Content-addressed file store.
//!
//! Files are placed at `<root>/<format>/<digest>.<format>`. The store never
//! consults the index; deciding whether a book is already known is the
//! ingestion service's job.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tempfile::NamedTempFile;

use crate::domain::{BookRecord, Digest, Format};
use crate::library::error::{LibraryError, LibraryResult};
use crate::library::hasher::hash_file;

/// Content store rooted at a library directory
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `root`. Nothing is created on disk yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every file of one format
    pub fn format_dir(&self, format: &Format) -> PathBuf {
        self.root.join(format.as_str())
    }

    /// Destination of a file with the given digest and format
    pub fn stored_path(&self, digest: &Digest, format: &Format) -> PathBuf {
        self.root.join(BookRecord::relative_path(digest, format))
    }

    /// Copy `src` into the store.
    ///
    /// Returns a record with unknown metadata. If a file with the same
    /// digest and format is already stored, nothing is copied.
    pub fn put(&self, src: &Path) -> LibraryResult<BookRecord> {
        let format = Format::from_path(src)?;
        let digest = hash_file(src)?;
        let dest = self.stored_path(&digest, &format);

        if dest.exists() {
            tracing::debug!(digest = %digest, "Content already stored, skipping copy");
        } else {
            let dir = self.format_dir(&format);
            fs::create_dir_all(&dir).map_err(|e| LibraryError::io(&dir, e))?;
            copy_preserving_attributes(src, &dest)?;
            tracing::debug!(digest = %digest, dest = %dest.display(), "Stored file");
        }

        Ok(BookRecord::new(digest, dest, format))
    }

    /// Whether a file with this digest and format is on disk
    pub fn contains(&self, digest: &Digest, format: &Format) -> bool {
        self.stored_path(digest, format).is_file()
    }
}

/// Copy through a temp file in the destination directory, then rename.
///
/// The copy keeps the source's permissions and timestamps. A crash mid-copy leaves only a stray temp file, never a
/// truncated file under the digest name.
fn copy_preserving_attributes(src: &Path, dest: &Path) -> LibraryResult<()> {
    let dir = dest.parent().unwrap_or(Path::new("."));

    let mut input = File::open(src).map_err(|e| LibraryError::io(src, e))?;
    let source_meta = input.metadata().map_err(|e| LibraryError::io(src, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| LibraryError::io(dir, e))?;
    io::copy(&mut input, tmp.as_file_mut()).map_err(|e| LibraryError::io(dest, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| LibraryError::io(dest, e))?;
    tmp.as_file()
        .set_permissions(source_meta.permissions())
        .map_err(|e| LibraryError::io(dest, e))?;

    // Timestamps are best effort; not every filesystem supports them
    let atime = FileTime::from_last_access_time(&source_meta);
    let mtime = FileTime::from_last_modification_time(&source_meta);
    if let Err(e) = filetime::set_file_times(tmp.path(), atime, mtime) {
        tracing::debug!("Could not preserve timestamps for {}: {}", dest.display(), e);
    }

    tmp.persist(dest)
        .map_err(|e| LibraryError::io(dest, e.error))?;

    Ok(())
}
