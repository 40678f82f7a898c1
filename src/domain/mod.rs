//! Domain types for the libris library.
//!
//! - BookRecord: one indexed file, keyed by content digest
//! - Digest / Format: the two halves of a stored path
//! - CatalogCandidate: metadata offered by an external catalog

pub mod book;
pub mod candidate;

// Re-export commonly used types
pub use book::{BookMetadata, BookRecord, Digest, Format};
pub use candidate::CatalogCandidate;
