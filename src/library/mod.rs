//! Content-addressed book storage and the library index.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//! ├── library_index.json        # Ordered array of book records
//! ├── hardcover_cache/          # Confirmed catalog selections (<key>.json)
//! ├── epub/
//! │   └── <sha256>.epub         # One file per distinct content
//! └── pdf/
//!     └── <sha256>.pdf
//! ```
//!
//! The index is loaded whole for every operation and saved after every
//! successful mutation. A single writer is assumed; there is no locking.

pub mod cache;
pub mod error;
pub mod hasher;
pub mod index;
pub mod query;
pub mod store;

pub use cache::{cache_key, CacheKey, CacheOutcome, MetadataCache};
pub use error::{LibraryError, LibraryResult};
pub use hasher::hash_file;
pub use index::{IndexFile, LibraryIndex};
pub use query::{filter, search_any, BookFilter, MatchMode};
pub use store::ContentStore;
