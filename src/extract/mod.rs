//! Metadata extractors.
//!
//! An extractor derives title/author from a format-specific file. Ingestion
//! treats every extractor failure as "metadata unknown", so implementations
//! should report malformed input as an error rather than guess.

pub mod epub;

use std::path::Path;

use thiserror::Error;

use crate::domain::BookMetadata;

pub use self::epub::EpubExtractor;

/// Errors that can occur while extracting metadata
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed package: {0}")]
    Malformed(String),
}

/// Trait for format-specific metadata extractors
pub trait MetadataExtractor: Send + Sync {
    /// Human-readable extractor name
    fn name(&self) -> &str;

    /// Read title and author from the file at `path`
    fn extract(&self, path: &Path) -> Result<BookMetadata, ExtractionError>;
}

/// Extractor that never finds any metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtractor;

impl MetadataExtractor for NoExtractor {
    fn name(&self) -> &str {
        "none"
    }

    fn extract(&self, _path: &Path) -> Result<BookMetadata, ExtractionError> {
        Ok(BookMetadata::unknown())
    }
}

/// Trim a raw metadata value; blank values become absent
pub(crate) fn clean_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
