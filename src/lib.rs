//! libris - Content-addressed e-book library
//!
//! Ingests book files into a store keyed by content digest, extracts
//! title/author from EPUB packages, and keeps a searchable JSON index.
//!
//! # Modules
//!
//! - `domain`: Data structures (BookRecord, Digest, Format, CatalogCandidate)
//! - `library`: Hashing, content store, index persistence, queries, metadata cache
//! - `extract`: Metadata extractors (EPUB)
//! - `ingest`: Single-file and folder import
//! - `adapters`: External catalog integrations (Hardcover)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Import a folder of EPUBs
//! libris import ~/Downloads/books
//!
//! # Search by title and author
//! libris search --title "lord rings" --mode relaxed
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod extract;
pub mod ingest;
pub mod library;

// Re-export main types at crate root for convenience
pub use config::LibraryConfig;
pub use domain::{BookMetadata, BookRecord, CatalogCandidate, Digest, Format};
pub use extract::{EpubExtractor, ExtractionError, MetadataExtractor, NoExtractor};
pub use ingest::{ImportReport, IngestOutcome, IngestService};
pub use library::{
    filter, search_any, BookFilter, ContentStore, IndexFile, LibraryError, LibraryIndex,
    LibraryResult, MatchMode,
};
