//! Command-line interface for libris.
//!
//! Provides commands for importing books, listing and searching the index,
//! re-extracting metadata, and fetching catalog metadata. All human-readable
//! formatting lives here.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::{build_query, CatalogProvider, HardcoverClient};
use crate::config::LibraryConfig;
use crate::domain::{BookRecord, Digest};
use crate::ingest::IngestService;
use crate::library::{filter, search_any, BookFilter, CacheOutcome, LibraryIndex, MatchMode, MetadataCache};

/// libris - Content-addressed e-book library
#[derive(Parser, Debug)]
#[command(name = "libris")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a file or a folder of books
    Import {
        /// File or folder to import
        path: PathBuf,

        /// Only import files directly inside the folder
        #[arg(long)]
        no_recursive: bool,
    },

    /// List every book in the library
    List,

    /// Filter the library by title, author and format (all must match)
    Search {
        /// Title query
        #[arg(short, long)]
        title: Option<String>,

        /// Author query
        #[arg(short, long)]
        author: Option<String>,

        /// Exact format (e.g. epub)
        #[arg(short, long)]
        format: Option<String>,

        /// Match mode for title and author
        #[arg(short, long, value_enum, default_value = "strict")]
        mode: ModeArg,
    },

    /// Free-text search over title or author
    Find {
        /// Search query
        query: String,

        /// Match mode
        #[arg(short, long, value_enum, default_value = "relaxed")]
        mode: ModeArg,
    },

    /// Re-read metadata from a stored book
    Reextract {
        /// Digest (or unique digest prefix)
        digest: String,
    },

    /// Look up a book in the Hardcover catalog and cache the chosen edition
    Fetch {
        /// Digest (or unique digest prefix)
        digest: String,

        /// Candidate number to pick (prompts when omitted)
        #[arg(short, long)]
        pick: Option<usize>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Match mode for CLI (maps to MatchMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Case-insensitive substring
    Strict,

    /// All words, any order
    Relaxed,
}

impl From<ModeArg> for MatchMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Strict => MatchMode::Strict,
            ModeArg::Relaxed => MatchMode::Relaxed,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = LibraryConfig::load()?;

        match self.command {
            Commands::Import { path, no_recursive } => import(&config, path, !no_recursive),
            Commands::List => list_library(&config),
            Commands::Search {
                title,
                author,
                format,
                mode,
            } => {
                let filter = BookFilter {
                    title,
                    author,
                    format,
                    mode: mode.into(),
                };
                search_library(&config, &filter)
            }
            Commands::Find { query, mode } => find_books(&config, &query, mode.into()),
            Commands::Reextract { digest } => reextract(&config, &digest),
            Commands::Fetch { digest, pick } => fetch_metadata(&config, &digest, pick).await,
            Commands::Config => show_config(&config),
        }
    }
}

/// Import a single file or a folder
fn import(config: &LibraryConfig, path: PathBuf, recursive: bool) -> Result<()> {
    let service = IngestService::new(config);

    if path.is_dir() {
        let report = service
            .ingest_folder(&path, recursive)
            .with_context(|| format!("Failed to import folder: {}", path.display()))?;

        println!(
            "Stored {} book(s) ({} new) from {}",
            report.success_count(),
            report.added,
            path.display()
        );
        if !report.failures.is_empty() {
            println!("\nFailed ({}):", report.failure_count());
            for failure in &report.failures {
                println!("  {}: {}", failure.path.display(), failure.reason);
            }
        }
        return Ok(());
    }

    let outcome = service
        .ingest_file(&path)
        .with_context(|| format!("Failed to import: {}", path.display()))?;

    let status = if outcome.is_new() { "Added" } else { "Already in library" };
    println!("{}:", status);
    print_record(outcome.record());

    Ok(())
}

/// List all books
fn list_library(config: &LibraryConfig) -> Result<()> {
    let index = IngestService::new(config).load_index()?;

    if index.is_empty() {
        println!("Library is empty. Use 'libris import <path>' to add books.");
        return Ok(());
    }

    print_records(index.records());
    println!("Total: {} books", index.len());

    Ok(())
}

/// Filter the library
fn search_library(config: &LibraryConfig, book_filter: &BookFilter) -> Result<()> {
    let index = IngestService::new(config).load_index()?;
    let results = filter(&index, book_filter);

    if results.is_empty() {
        println!("No matching books");
        return Ok(());
    }

    println!("Found {} book(s):\n", results.len());
    print_records(&results);

    Ok(())
}

/// Free-text search
fn find_books(config: &LibraryConfig, query: &str, mode: MatchMode) -> Result<()> {
    let index = IngestService::new(config).load_index()?;
    let results = search_any(&index, query, mode);

    if results.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("Found {} result(s) for \"{}\":\n", results.len(), query);
    print_records(&results);

    Ok(())
}

/// Re-run metadata extraction for one book
fn reextract(config: &LibraryConfig, digest: &str) -> Result<()> {
    let service = IngestService::new(config);
    let index = service.load_index()?;
    let digest = resolve_digest(&index, digest)?;

    let record = service.reextract(&digest)?;
    println!("Updated:");
    print_record(&record);

    Ok(())
}

/// Search the catalog for a book and cache the chosen candidate
async fn fetch_metadata(config: &LibraryConfig, digest: &str, pick: Option<usize>) -> Result<()> {
    let index = IngestService::new(config).load_index()?;
    let digest = resolve_digest(&index, digest)?;
    let record = index
        .get(&digest)
        .with_context(|| format!("No book with digest {}", digest))?;

    let query = build_query(record)
        .context("Book has no title; re-extract metadata before fetching")?;

    let client = HardcoverClient::from_settings(&config.hardcover)?;
    eprintln!("Searching {} for: {}", client.name(), query);
    let candidates = client.search(&query).await;

    if candidates.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Select the correct edition:");
    for (idx, candidate) in candidates.iter().enumerate() {
        println!("{}. {} by {}", idx + 1, candidate.title, candidate.authors_display());
    }

    let choice = match pick {
        Some(n) => Some(n),
        None => prompt_number("\nEnter the number of the correct edition: ")?,
    };
    let selected = &candidates[resolve_pick(choice, candidates.len())];

    let cache = MetadataCache::new(&config.cache_dir);
    match cache.save(selected)? {
        CacheOutcome::Cached { key, path } => {
            println!("Cached \"{}\" as {} ({})", selected.title, key, path.display());
        }
        CacheOutcome::Uncacheable => {
            eprintln!("Warning: \"{}\" has no ISBN, slug or title; not cached", selected.title);
        }
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(config: &LibraryConfig) -> Result<()> {
    println!("Library root:     {}", config.root.display());
    println!("Index file:       {}", config.index_path().display());
    println!("Cache directory:  {}", config.cache_dir.display());
    println!("Import extension: {}", config.import_extension);
    println!(
        "Config file:      {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("Hardcover API:    {}", config.hardcover.api_url);
    println!(
        "Hardcover token:  {}",
        if config.hardcover.token.is_some() { "set" } else { "not set" }
    );

    Ok(())
}

fn print_records(records: &[BookRecord]) {
    for record in records {
        print_record(record);
    }
}

fn print_record(record: &BookRecord) {
    println!(
        "- {} by {}",
        record.title().unwrap_or("Unknown title"),
        record.author().unwrap_or("Unknown author")
    );
    println!("  Digest: {}", record.digest);
    println!("  Stored Path: {}", record.stored_path.display());
    println!("  Format: {}\n", record.format);
}

/// Find the single indexed digest equal to or starting with `input`
fn resolve_digest(index: &LibraryIndex, input: &str) -> Result<Digest> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        anyhow::bail!("Empty digest");
    }

    let matches: Vec<&Digest> = index
        .iter()
        .map(|r| &r.digest)
        .filter(|d| d.as_str().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [] => anyhow::bail!("No book with digest {}", input),
        [digest] => Ok((*digest).clone()),
        _ if matches.iter().any(|d| d.as_str() == needle) => Ok(Digest::from_hex(&needle)),
        _ => anyhow::bail!("Digest prefix {} is ambiguous ({} matches)", input, matches.len()),
    }
}

/// 1-based user choice to a 0-based index; anything invalid picks the first
fn resolve_pick(choice: Option<usize>, count: usize) -> usize {
    match choice {
        Some(n) if n >= 1 && n <= count => n - 1,
        _ => {
            eprintln!("Invalid selection. Using result 1.");
            0
        }
    }
}

fn prompt_number(prompt: &str) -> Result<Option<usize>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read selection")?;

    Ok(line.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(hashes: &[&str]) -> LibraryIndex {
        LibraryIndex::from_records(hashes.iter().map(|h| {
            BookRecord::new(
                Digest::from_hex(h),
                PathBuf::from(format!("epub/{}.epub", h)),
                "epub".parse().unwrap(),
            )
        }))
    }

    #[test]
    fn test_resolve_digest_prefix() {
        let index = index_with(&["abc123", "abd456"]);

        assert_eq!(resolve_digest(&index, "ABC").unwrap().as_str(), "abc123");
        assert!(resolve_digest(&index, "ab").is_err());
        assert!(resolve_digest(&index, "zz").is_err());
        assert!(resolve_digest(&index, " ").is_err());
    }

    #[test]
    fn test_resolve_pick() {
        assert_eq!(resolve_pick(Some(2), 3), 1);
        assert_eq!(resolve_pick(Some(0), 3), 0);
        assert_eq!(resolve_pick(Some(9), 3), 0);
        assert_eq!(resolve_pick(None, 3), 0);
    }

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "libris", "search", "--title", "lord rings", "--mode", "relaxed",
        ])
        .unwrap();

        match cli.command {
            Commands::Search { title, mode, .. } => {
                assert_eq!(title.as_deref(), Some("lord rings"));
                assert_eq!(MatchMode::from(mode), MatchMode::Relaxed);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
