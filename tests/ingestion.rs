//! Ingestion Integration Tests
//!
//! Tests for idempotent import, content deduplication, extraction fallback
//! and best-effort folder import.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use libris::{
    BookMetadata, BookRecord, ExtractionError, IngestService, LibraryConfig, LibraryError,
    MetadataExtractor,
};
use tempfile::TempDir;

/// Minimal bytes that pass the EPUB container check
const ZIP_HEADER: &[u8] = b"PK\x03\x04";

/// Extractor that derives metadata from the file contents.
///
/// Files whose body after the ZIP header reads `title|author` yield that
/// metadata; anything else is reported as malformed.
struct FakeExtractor {
    calls: Arc<AtomicUsize>,
}

impl MetadataExtractor for FakeExtractor {
    fn name(&self) -> &str {
        "fake"
    }

    fn extract(&self, path: &Path) -> Result<BookMetadata, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = std::fs::read(path)?;
        let body = String::from_utf8_lossy(&bytes[ZIP_HEADER.len().min(bytes.len())..]).to_string();

        match body.split_once('|') {
            Some((title, author)) => Ok(BookMetadata::new(
                Some(title.to_string()),
                Some(author.to_string()),
            )),
            None => Err(ExtractionError::Malformed("no package document".into())),
        }
    }
}

struct Fixture {
    temp: TempDir,
    config: LibraryConfig,
    calls: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = LibraryConfig::with_root(temp.path().join("library"));
        Self {
            temp,
            config,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn service(&self) -> IngestService {
        let extractor = FakeExtractor {
            calls: self.calls.clone(),
        };
        IngestService::with_extractor(&self.config, Box::new(extractor))
    }

    fn source_dir(&self) -> PathBuf {
        self.temp.path().join("incoming")
    }

    /// Write an EPUB-looking file under the source directory
    fn epub(&self, rel: &str, title: &str, author: &str) -> PathBuf {
        self.write(rel, &[ZIP_HEADER, format!("{}|{}", title, author).as_bytes()].concat())
    }

    fn write(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.source_dir().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn stored_files(&self, format: &str) -> usize {
        let dir = self.config.root.join(format);
        if !dir.exists() {
            return 0;
        }
        std::fs::read_dir(dir).unwrap().count()
    }
}

#[test]
fn test_ingest_file_adds_record_with_metadata() {
    let fx = Fixture::new();
    let src = fx.epub("dune.epub", "Dune", "Frank Herbert");

    let outcome = fx.service().ingest_file(&src).unwrap();

    assert!(outcome.is_new());
    let record = outcome.record();
    assert_eq!(record.title(), Some("Dune"));
    assert_eq!(record.author(), Some("Frank Herbert"));
    assert_eq!(record.format.as_str(), "epub");
    assert!(record.imported_at.is_some());
    assert_eq!(
        record.stored_path,
        fx.config
            .root
            .join(BookRecord::relative_path(&record.digest, &record.format))
    );

    let index = fx.service().load_index().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.records()[0], *record);
}

#[test]
fn test_ingest_same_content_twice_is_idempotent() {
    let fx = Fixture::new();
    let first_src = fx.epub("dune.epub", "Dune", "Frank Herbert");
    let second_src = fx.write("copy of dune.EPUB", &std::fs::read(&first_src).unwrap());
    let service = fx.service();

    let first = service.ingest_file(&first_src).unwrap();
    let second = service.ingest_file(&second_src).unwrap();

    assert!(first.is_new());
    assert!(!second.is_new());
    assert_eq!(first.record().digest, second.record().digest);
    assert_eq!(first.record(), second.record());

    assert_eq!(service.load_index().unwrap().len(), 1);
    assert_eq!(fx.stored_files("epub"), 1);
    // The second import never reaches the extractor
    assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_same_bytes_different_format_stored_twice() {
    let fx = Fixture::new();
    let epub = fx.epub("book.epub", "Same", "Bytes");
    let zip = fx.write("book.zip", &std::fs::read(&epub).unwrap());
    let service = fx.service();

    let a = service.ingest_file(&epub).unwrap();
    let b = service.ingest_file(&zip).unwrap();

    assert!(a.is_new());
    assert_eq!(fx.stored_files("epub"), 1);
    assert_eq!(fx.stored_files("zip"), 1);

    // The index is keyed by digest alone, so the first record is returned and kept
    assert!(!b.is_new());
    assert_eq!(a.record(), b.record());
    let index = service.load_index().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.records()[0].format.as_str(), "epub");
}

#[test]
fn test_corrupt_epub_falls_back_to_unknown_metadata() {
    let fx = Fixture::new();
    let src = fx.write("broken.epub", b"PK\x03\x04garbage without a package");

    let outcome = fx.service().ingest_file(&src).unwrap();

    assert!(outcome.is_new());
    assert!(outcome.record().metadata.is_unknown());
    assert!(outcome.record().stored_path.exists());
    assert_eq!(fx.service().load_index().unwrap().len(), 1);
}

#[test]
fn test_corrupt_epub_with_real_extractor_still_stored() {
    let fx = Fixture::new();
    let src = fx.write("broken.epub", b"PK\x03\x04definitely not a zip archive");

    let outcome = IngestService::new(&fx.config).ingest_file(&src).unwrap();

    assert!(outcome.record().metadata.is_unknown());
    assert!(outcome.record().stored_path.exists());
}

#[test]
fn test_non_epub_formats_skip_extraction() {
    let fx = Fixture::new();
    let src = fx.write("paper.pdf", b"%PDF-1.7 Dune|Herbert");

    let outcome = fx.service().ingest_file(&src).unwrap();

    assert!(outcome.record().metadata.is_unknown());
    assert_eq!(outcome.record().format.as_str(), "pdf");
    assert_eq!(fx.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_file_without_extension_is_rejected() {
    let fx = Fixture::new();
    let src = fx.write("README", b"hello");

    let err = fx.service().ingest_file(&src).unwrap_err();

    assert!(matches!(err, LibraryError::InvalidInput(_)));
    assert!(fx.service().load_index().unwrap().is_empty());
}

#[test]
fn test_masquerading_epub_is_rejected_before_storing() {
    let fx = Fixture::new();
    let src = fx.write("fake.epub", b"%PDF-1.7 not a zip");

    let err = fx.service().ingest_file(&src).unwrap_err();

    assert!(matches!(err, LibraryError::InvalidInput(_)));
    assert_eq!(fx.stored_files("epub"), 0);
}

#[test]
fn test_missing_file_is_io_error() {
    let fx = Fixture::new();
    let err = fx
        .service()
        .ingest_file(&fx.source_dir().join("ghost.epub"))
        .unwrap_err();

    assert!(matches!(err, LibraryError::Io { .. }));
}

#[test]
fn test_corrupt_index_is_surfaced() {
    let fx = Fixture::new();
    std::fs::create_dir_all(&fx.config.root).unwrap();
    std::fs::write(fx.config.index_path(), "[{ broken").unwrap();
    let src = fx.epub("dune.epub", "Dune", "Frank Herbert");

    let err = fx.service().ingest_file(&src).unwrap_err();

    assert!(matches!(err, LibraryError::CorruptIndex { .. }));
    assert_eq!(fx.stored_files("epub"), 0);
    // The broken index is left for the operator, not silently reset
    assert_eq!(
        std::fs::read_to_string(fx.config.index_path()).unwrap(),
        "[{ broken"
    );
}

#[test]
fn test_folder_import_is_best_effort() {
    let fx = Fixture::new();
    for i in 0..5 {
        fx.epub(&format!("book{}.epub", i), &format!("Book {}", i), "Author");
    }
    let fake = fx.write("masquerade.epub", b"This is a text file");
    fx.write("notes.txt", b"ignored, wrong extension");

    let report = fx.service().ingest_folder(&fx.source_dir(), true).unwrap();

    assert_eq!(report.success_count(), 5);
    assert_eq!(report.added, 5);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures[0].path, fake);
    assert!(!report.failures[0].reason.is_empty());
    assert_eq!(fx.service().load_index().unwrap().len(), 5);
}

#[test]
fn test_folder_import_aborts_on_corrupt_index() {
    let fx = Fixture::new();
    std::fs::create_dir_all(&fx.config.root).unwrap();
    std::fs::write(fx.config.index_path(), "[{ broken").unwrap();
    for i in 0..3 {
        fx.epub(&format!("book{}.epub", i), &format!("Book {}", i), "Author");
    }

    let err = fx
        .service()
        .ingest_folder(&fx.source_dir(), true)
        .unwrap_err();

    assert!(matches!(err, LibraryError::CorruptIndex { .. }));
    assert_eq!(fx.stored_files("epub"), 0);
    assert_eq!(fx.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_folder_import_recursive_flag() {
    let fx = Fixture::new();
    fx.epub("top.epub", "Top", "A");
    fx.epub("nested/deeper/inner.EPUB", "Inner", "B");
    let service = fx.service();

    let shallow = service.ingest_folder(&fx.source_dir(), false).unwrap();
    assert_eq!(shallow.success_count(), 1);
    assert_eq!(shallow.stored[0].title(), Some("Top"));

    let deep = service.ingest_folder(&fx.source_dir(), true).unwrap();
    assert_eq!(deep.success_count(), 2);
    assert_eq!(deep.added, 1);
    assert_eq!(service.load_index().unwrap().len(), 2);
}

#[test]
fn test_folder_import_missing_folder() {
    let fx = Fixture::new();
    let err = fx
        .service()
        .ingest_folder(&fx.temp.path().join("nope"), true)
        .unwrap_err();

    assert!(matches!(err, LibraryError::Io { .. }));
}

#[test]
fn test_reextract_replaces_metadata() {
    let fx = Fixture::new();
    let src = fx.write("broken.epub", b"PK\x03\x04no metadata yet");
    let service = fx.service();
    let record = service.ingest_file(&src).unwrap().into_record();
    assert!(record.metadata.is_unknown());

    // Repair the stored copy, then re-read it
    std::fs::write(&record.stored_path, b"PK\x03\x04Dune|Frank Herbert").unwrap();
    let updated = service.reextract(&record.digest).unwrap();

    assert_eq!(updated.title(), Some("Dune"));
    assert_eq!(updated.digest, record.digest);
    let index = service.load_index().unwrap();
    assert_eq!(index.get(&record.digest).unwrap().title(), Some("Dune"));
}

#[test]
fn test_reextract_failure_keeps_existing_metadata() {
    let fx = Fixture::new();
    let src = fx.epub("dune.epub", "Dune", "Frank Herbert");
    let service = fx.service();
    let record = service.ingest_file(&src).unwrap().into_record();

    std::fs::write(&record.stored_path, b"PK\x03\x04garbage").unwrap();
    let err = service.reextract(&record.digest).unwrap_err();

    assert!(matches!(err, LibraryError::Extraction(_)));
    let index = service.load_index().unwrap();
    assert_eq!(index.get(&record.digest).unwrap().title(), Some("Dune"));
}

#[test]
fn test_reextract_unknown_digest() {
    let fx = Fixture::new();
    let err = fx
        .service()
        .reextract(&libris::Digest::from_hex("deadbeef"))
        .unwrap_err();

    assert!(matches!(err, LibraryError::UnknownDigest(_)));
}
