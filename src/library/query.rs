//! Filtering and search over an in-memory index.
//!
//! All functions here are pure: they never touch the index on disk and
//! return matches in index order.

use serde::{Deserialize, Serialize};

use crate::domain::BookRecord;
use crate::library::error::{LibraryError, LibraryResult};
use crate::library::index::LibraryIndex;

/// How title and author predicates are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case-insensitive substring match
    #[default]
    Strict,

    /// Every whitespace-separated query token must appear, in any order
    Relaxed,
}

impl MatchMode {
    /// Compare `needle` against `haystack` in this mode
    pub fn matches(self, haystack: &str, needle: &str) -> bool {
        let haystack = haystack.to_lowercase();
        match self {
            MatchMode::Strict => haystack.contains(&needle.to_lowercase()),
            MatchMode::Relaxed => needle
                .to_lowercase()
                .split_whitespace()
                .all(|word| haystack.contains(word)),
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Strict => write!(f, "strict"),
            MatchMode::Relaxed => write!(f, "relaxed"),
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = LibraryError;

    fn from_str(s: &str) -> LibraryResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(MatchMode::Strict),
            "relaxed" => Ok(MatchMode::Relaxed),
            _ => Err(LibraryError::InvalidInput(format!("Unknown match mode: {}", s))),
        }
    }
}

/// Predicates for [`filter`]. Every supplied predicate must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub format: Option<String>,
    pub mode: MatchMode,
}

impl BookFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// True when no predicate is supplied (empty strings count as absent)
    pub fn is_empty(&self) -> bool {
        supplied(&self.title).is_none()
            && supplied(&self.author).is_none()
            && supplied(&self.format).is_none()
    }

    /// Whether a single record satisfies every supplied predicate
    pub fn accepts(&self, record: &BookRecord) -> bool {
        if let Some(title) = supplied(&self.title) {
            match record.title() {
                Some(t) if self.mode.matches(t, title) => {}
                _ => return false,
            }
        }

        if let Some(author) = supplied(&self.author) {
            match record.author() {
                Some(a) if self.mode.matches(a, author) => {}
                _ => return false,
            }
        }

        if let Some(format) = supplied(&self.format) {
            let format = format.trim().trim_start_matches('.');
            if !record.format.as_str().eq_ignore_ascii_case(format) {
                return false;
            }
        }

        true
    }
}

fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Return the records matching every supplied predicate, in index order.
///
/// With no predicates the whole index is returned unchanged.
pub fn filter(index: &LibraryIndex, filter: &BookFilter) -> Vec<BookRecord> {
    if filter.is_empty() {
        return index.records().to_vec();
    }

    index
        .iter()
        .filter(|record| filter.accepts(record))
        .cloned()
        .collect()
}

/// Free-text lookup: records whose title OR author matches `query`.
///
/// An empty query returns the whole index.
pub fn search_any(index: &LibraryIndex, query: &str, mode: MatchMode) -> Vec<BookRecord> {
    if query.trim().is_empty() {
        return index.records().to_vec();
    }

    index
        .iter()
        .filter(|record| {
            record.title().is_some_and(|t| mode.matches(t, query))
                || record.author().is_some_and(|a| mode.matches(a, query))
        })
        .cloned()
        .collect()
}
