//! Cache of user-confirmed catalog selections.
//!
//! Each selection is written to `<cache_dir>/<key>.json`. The key is the
//! first ISBN, else the slug, else the lowercased title with spaces turned
//! into underscores. A candidate with none of these is not cached.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::CatalogCandidate;

/// Errors that can occur with the metadata cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File-safe key for a cached selection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the cache key for a candidate, if it has one
pub fn cache_key(candidate: &CatalogCandidate) -> Option<CacheKey> {
    let raw = candidate
        .isbns
        .first()
        .and_then(|isbn| non_empty(isbn.as_str()))
        .or_else(|| candidate.slug.as_deref().and_then(non_empty))
        .or_else(|| non_empty(candidate.title.as_str()).map(|t| t.to_lowercase().replace(' ', "_")))?;

    Some(CacheKey(raw.replace(['/', '\\'], "_")))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Result of saving a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Written under this key
    Cached { key: CacheKey, path: PathBuf },

    /// Candidate had no ISBN, slug or title
    Uncacheable,
}

/// Directory of cached selections
#[derive(Debug, Clone)]
pub struct MetadataCache {
    dir: PathBuf,
}

impl MetadataCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Store a selection, creating the cache directory on demand
    pub fn save(&self, candidate: &CatalogCandidate) -> Result<CacheOutcome, CacheError> {
        let Some(key) = cache_key(candidate) else {
            tracing::warn!(
                "Not caching {:?}: no ISBN, slug or title to key it by",
                candidate.title
            );
            return Ok(CacheOutcome::Uncacheable);
        };

        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(&key);
        let content = serde_json::to_string_pretty(candidate)?;
        fs::write(&path, content)?;

        tracing::info!(key = %key, "Cached catalog metadata");
        Ok(CacheOutcome::Cached { key, path })
    }

    /// Load a cached selection
    pub fn load(&self, key: &CacheKey) -> Result<Option<CatalogCandidate>, CacheError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}
