//! Errors for store, index and ingestion operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::extract::ExtractionError;

/// Errors that can occur while storing, indexing or querying books
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Corrupt index {}: {source}", .path.display())]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Metadata extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("No book with digest {0} in the index")]
    UnknownDigest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LibraryError {
    /// Attach a path to an IO error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for library operation results.
pub type LibraryResult<T> = std::result::Result<T, LibraryError>;
