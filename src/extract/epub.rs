//! EPUB metadata extraction using the `epub` crate.
//!
//! Reads the package document referenced by `META-INF/container.xml` and
//! takes the first `dc:title` and `dc:creator`.

use std::path::Path;

use ::epub::doc::EpubDoc;

use super::{clean_value, ExtractionError, MetadataExtractor};
use crate::domain::BookMetadata;

/// EPUB package metadata extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubExtractor;

impl MetadataExtractor for EpubExtractor {
    fn name(&self) -> &str {
        "epub"
    }

    fn extract(&self, path: &Path) -> Result<BookMetadata, ExtractionError> {
        if !path.is_file() {
            return Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a file", path.display()),
            )));
        }

        let doc = EpubDoc::new(path)
            .map_err(|e| ExtractionError::Malformed(format!("{}: {}", path.display(), e)))?;

        let title = clean_value(doc.mdata("title").map(|m| m.value.clone()));
        let author = clean_value(doc.mdata("creator").map(|m| m.value.clone()));

        Ok(BookMetadata::new(title, author))
    }
}
