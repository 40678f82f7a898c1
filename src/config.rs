//! Configuration for libris.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (LIBRARY_ROOT, HARDCOVER_TOKEN, HARDCOVER_API_URL)
//! 2. Config file (.libris/config.yaml)
//! 3. Defaults (./library_files)
//!
//! Config file discovery:
//! - Searches current directory and parents for .libris/config.yaml
//! - Paths in config file are relative to the directory containing .libris/
//!
//! The configuration is resolved once at startup and handed to each
//! component; nothing here is cached globally.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::library::index::INDEX_FILE_NAME;

pub const ENV_LIBRARY_ROOT: &str = "LIBRARY_ROOT";
pub const ENV_HARDCOVER_TOKEN: &str = "HARDCOVER_TOKEN";
pub const ENV_HARDCOVER_API_URL: &str = "HARDCOVER_API_URL";

pub const DEFAULT_LIBRARY_ROOT: &str = "library_files";
pub const DEFAULT_HARDCOVER_API_URL: &str = "https://api.hardcover.app/v1/graphql";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub library: LibrarySection,
    #[serde(default)]
    pub hardcover: Option<HardcoverSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibrarySection {
    /// Library root (relative to the config file's project directory)
    pub root: Option<String>,
    /// Metadata cache directory (relative to the library root)
    pub cache_dir: Option<String>,
    /// Extension picked up by folder imports
    pub import_extension: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HardcoverSection {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub per_page: Option<u32>,
}

/// Settings for the Hardcover catalog client
#[derive(Debug, Clone)]
pub struct HardcoverSettings {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
    pub per_page: u32,
}

impl Default for HardcoverSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_HARDCOVER_API_URL.to_string(),
            token: None,
            timeout_seconds: 15,
            per_page: 25,
        }
    }
}

impl HardcoverSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Library root holding the store and the index
    pub root: PathBuf,
    /// Directory for cached catalog selections
    pub cache_dir: PathBuf,
    /// Extension picked up by folder imports
    pub import_extension: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Catalog client settings
    pub hardcover: HardcoverSettings,
}

impl LibraryConfig {
    /// Configuration rooted at `root` with every other setting defaulted
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            cache_dir: root.join("hardcover_cache"),
            root,
            import_extension: "epub".to_string(),
            config_file: None,
            hardcover: HardcoverSettings::default(),
        }
    }

    /// Path of the persisted index
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    /// Load configuration from all sources
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();
        let file = match config_file {
            Some(ref path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Ok(Self::resolve(file, config_file, env))
    }

    /// Merge a parsed config file with environment lookups
    fn resolve(
        file: ConfigFile,
        config_file: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        // Base directory is the parent of .libris/ (i.e., grandparent of config.yaml)
        let base_dir = config_file
            .as_deref()
            .and_then(Path::parent)
            .and_then(Path::parent)
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let root = if let Some(env_root) = env(ENV_LIBRARY_ROOT) {
            expand_home(&env_root)
        } else if let Some(ref root) = file.library.root {
            resolve_path(&base_dir, root)
        } else {
            PathBuf::from(DEFAULT_LIBRARY_ROOT)
        };

        let mut config = Self::with_root(root);
        config.config_file = config_file;

        if let Some(ref cache_dir) = file.library.cache_dir {
            config.cache_dir = resolve_path(&config.root, cache_dir);
        }
        if let Some(ext) = file.library.import_extension {
            config.import_extension = ext.trim_start_matches('.').to_lowercase();
        }

        if let Some(section) = file.hardcover {
            let defaults = HardcoverSettings::default();
            config.hardcover = HardcoverSettings {
                api_url: section.api_url.unwrap_or(defaults.api_url),
                token: section.token,
                timeout_seconds: section.timeout_seconds.unwrap_or(defaults.timeout_seconds),
                per_page: section.per_page.unwrap_or(defaults.per_page),
            };
        }
        if let Some(token) = env(ENV_HARDCOVER_TOKEN) {
            config.hardcover.token = Some(token);
        }
        if let Some(url) = env(ENV_HARDCOVER_API_URL) {
            config.hardcover.api_url = url;
        }

        config
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".libris").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Expand a leading `~/` to the home directory
fn expand_home(path_str: &str) -> PathBuf {
    match path_str.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path_str)),
        None => PathBuf::from(path_str),
    }
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = expand_home(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
