//! Adapter interfaces for external catalog services.
//!
//! A catalog provider turns a free-text query into candidate metadata
//! records. Providers never fail from the caller's point of view: service
//! errors are logged and produce an empty result.

pub mod hardcover;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BookRecord, CatalogCandidate};

// Re-export the Hardcover adapter
pub use hardcover::HardcoverClient;

/// Errors raised inside catalog adapters
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Trait for external metadata catalogs
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Search the catalog; errors yield an empty vector
    async fn search(&self, query: &str) -> Vec<CatalogCandidate>;
}

/// Catalog query for an indexed book: `"<title> <author>"`.
///
/// Returns `None` for books without a title.
pub fn build_query(record: &BookRecord) -> Option<String> {
    let title = record.title()?.trim();
    if title.is_empty() {
        return None;
    }

    let query = format!("{} {}", title, record.author().unwrap_or_default());
    Some(query.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookMetadata, Digest};
    use std::path::PathBuf;

    fn record(title: Option<&str>, author: Option<&str>) -> BookRecord {
        BookRecord::new(
            Digest::from_hex("aa"),
            PathBuf::from("epub/aa.epub"),
            "epub".parse().unwrap(),
        )
        .with_metadata(BookMetadata::new(
            title.map(String::from),
            author.map(String::from),
        ))
    }

    #[test]
    fn test_build_query() {
        assert_eq!(
            build_query(&record(Some("Dune"), Some("Frank Herbert"))),
            Some("Dune Frank Herbert".to_string())
        );
        assert_eq!(build_query(&record(Some("Dune"), None)), Some("Dune".to_string()));
        assert_eq!(build_query(&record(None, Some("Frank Herbert"))), None);
        assert_eq!(build_query(&record(Some("  "), None)), None);
    }
}
