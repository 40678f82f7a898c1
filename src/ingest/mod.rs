//! Book ingestion.
//!
//! The ingestion service is the only writer of the content store and the
//! index. Single files fail fast with a typed error; folder imports are
//! best effort and report failures per file.

pub mod service;

// Re-export key types
pub use service::{ImportFailure, ImportReport, IngestOutcome, IngestService};
