//! Ingestion service: the single writer of the store and the index.
//!
//! Flow for one file:
//!
//! ```text
//! source file → load index → ContentStore::put → index lookup ─(present)→ AlreadyPresent
//!                                        │
//!                                        └─(new)→ extract → append → save → Added
//! ```

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Utc;
use glob::MatchOptions;
use tracing::{debug, info, warn};

use crate::config::LibraryConfig;
use crate::domain::{BookMetadata, BookRecord, Digest, Format};
use crate::extract::{EpubExtractor, MetadataExtractor};
use crate::library::error::{LibraryError, LibraryResult};
use crate::library::index::{IndexFile, LibraryIndex};
use crate::library::store::ContentStore;

/// Leading bytes of a ZIP local file header, which every EPUB starts with
const ZIP_SIGNATURE: [u8; 4] = *b"PK\x03\x04";

/// Result of ingesting a single file
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// New record appended to the index
    Added(BookRecord),

    /// Content was already indexed; the existing record is returned
    AlreadyPresent(BookRecord),
}

impl IngestOutcome {
    /// Get the record regardless of outcome
    pub fn record(&self) -> &BookRecord {
        match self {
            Self::Added(record) | Self::AlreadyPresent(record) => record,
        }
    }

    pub fn into_record(self) -> BookRecord {
        match self {
            Self::Added(record) | Self::AlreadyPresent(record) => record,
        }
    }

    /// Check if this was a new record
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// A file that could not be imported during a folder import
#[derive(Debug, Clone)]
pub struct ImportFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of a folder import
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Records for every successfully ingested file (new or already present)
    pub stored: Vec<BookRecord>,

    /// Number of records that were new to the index
    pub added: usize,

    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn success_count(&self) -> usize {
        self.stored.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    fn record_failure(&mut self, path: PathBuf, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Failed to store {}: {}", path.display(), reason);
        self.failures.push(ImportFailure { path, reason });
    }
}

/// Composes store, extractor and index to import books
pub struct IngestService {
    store: ContentStore,
    index_file: IndexFile,
    extractor: Box<dyn MetadataExtractor>,
    import_extension: String,
}

impl IngestService {
    /// Create a service for the configured library using the EPUB extractor
    pub fn new(config: &LibraryConfig) -> Self {
        Self::with_extractor(config, Box::new(EpubExtractor))
    }

    /// Create a service with a custom extractor
    pub fn with_extractor(config: &LibraryConfig, extractor: Box<dyn MetadataExtractor>) -> Self {
        Self {
            store: ContentStore::new(&config.root),
            index_file: IndexFile::new(config.index_path()),
            extractor,
            import_extension: config.import_extension.clone(),
        }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn index_file(&self) -> &IndexFile {
        &self.index_file
    }

    /// Read-only snapshot of the current index
    pub fn load_index(&self) -> LibraryResult<LibraryIndex> {
        self.index_file.load()
    }

    /// Import one file into the store and index.
    ///
    /// Ingesting content that is already indexed is a no-op that returns
    /// the existing record.
    pub fn ingest_file(&self, path: &Path) -> LibraryResult<IngestOutcome> {
        let format = Format::from_path(path)?;
        if format.is_epub() {
            ensure_zip_container(path)?;
        }

        // A corrupt index must fail before anything is copied into the store
        let mut index = self.index_file.load()?;
        let stored = self.store.put(path)?;

        if let Some(existing) = index.get(&stored.digest) {
            debug!(digest = %stored.digest, "Already indexed: {}", path.display());
            return Ok(IngestOutcome::AlreadyPresent(existing.clone()));
        }

        let metadata = if stored.format.is_epub() {
            self.extract_or_unknown(&stored.stored_path)
        } else {
            BookMetadata::unknown()
        };

        let record = stored.with_metadata(metadata).with_imported_at(Utc::now());
        index.append(record.clone());
        self.index_file.save(&index)?;

        info!(digest = %record.digest, format = %record.format, "Added {}", path.display());
        Ok(IngestOutcome::Added(record))
    }

    /// Import every file with the configured extension under `folder`.
    ///
    /// Best effort: a failing file is logged, reported, and skipped. A
    /// corrupt index aborts the whole import.
    pub fn ingest_folder(&self, folder: &Path, recursive: bool) -> LibraryResult<ImportReport> {
        if !folder.exists() {
            return Err(LibraryError::io(
                folder,
                std::io::Error::new(std::io::ErrorKind::NotFound, "folder does not exist"),
            ));
        }
        if !folder.is_dir() {
            return Err(LibraryError::InvalidInput(format!(
                "Not a directory: {}",
                folder.display()
            )));
        }

        let pattern = self.folder_pattern(folder, recursive);
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };
        let entries = glob::glob_with(&pattern, options)
            .map_err(|e| LibraryError::InvalidInput(format!("Bad import pattern {}: {}", pattern, e)))?;

        self.index_file.load()?;

        let mut report = ImportReport::default();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    let path = e.path().to_path_buf();
                    report.record_failure(path, e.error().to_string());
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            match self.ingest_file(&path) {
                Ok(outcome) => {
                    if outcome.is_new() {
                        report.added += 1;
                    }
                    report.stored.push(outcome.into_record());
                }
                Err(e @ LibraryError::CorruptIndex { .. }) => return Err(e),
                Err(e) => report.record_failure(path, e.to_string()),
            }
        }

        info!(
            stored = report.success_count(),
            added = report.added,
            failed = report.failure_count(),
            "Imported {}",
            folder.display()
        );
        Ok(report)
    }

    /// Re-run the extractor on a stored book and replace its metadata
    pub fn reextract(&self, digest: &Digest) -> LibraryResult<BookRecord> {
        let mut index = self.index_file.load()?;
        let record = index
            .get(digest)
            .ok_or_else(|| LibraryError::UnknownDigest(digest.to_string()))?;

        let metadata = self.extractor.extract(&record.stored_path)?;
        let updated = index.update_metadata(digest, metadata)?.clone();
        self.index_file.save(&index)?;

        info!(digest = %digest, "Re-extracted metadata");
        Ok(updated)
    }

    fn extract_or_unknown(&self, path: &Path) -> BookMetadata {
        match self.extractor.extract(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    extractor = self.extractor.name(),
                    "Metadata extraction failed for {}: {}",
                    path.display(),
                    e
                );
                BookMetadata::unknown()
            }
        }
    }

    fn folder_pattern(&self, folder: &Path, recursive: bool) -> String {
        let base = glob::Pattern::escape(&folder.to_string_lossy());
        let ext = glob::Pattern::escape(&self.import_extension);
        if recursive {
            format!("{}/**/*.{}", base, ext)
        } else {
            format!("{}/*.{}", base, ext)
        }
    }
}

/// Reject files that claim to be EPUB but are not ZIP containers
fn ensure_zip_container(path: &Path) -> LibraryResult<()> {
    let mut header = [0u8; 4];
    let mut file = File::open(path).map_err(|e| LibraryError::io(path, e))?;
    match file.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(LibraryError::InvalidInput(format!(
                "Too short for an EPUB container: {}",
                path.display()
            )));
        }
        Err(e) => return Err(LibraryError::io(path, e)),
    }

    if header != ZIP_SIGNATURE {
        return Err(LibraryError::InvalidInput(format!(
            "Not an EPUB container: {}",
            path.display()
        )));
    }
    Ok(())
}
