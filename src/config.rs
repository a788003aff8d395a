//! Configuration for learnshelf.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (LEARNSHELF_HOME, LEARNSHELF_SCHEMA)
//! 2. Config file (.learnshelf/config.yaml)
//! 3. Defaults (~/.learnshelf)
//!
//! Config file discovery:
//! - Searches current directory and parents for .learnshelf/config.yaml
//! - `paths.home` in the config file is relative to the .learnshelf/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::library::{PdfStorage, SchemaVariant, SortSpec};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".learnshelf";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub library: Option<LibraryConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Data directory (relative to .learnshelf/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryConfig {
    pub schema: Option<SchemaVariant>,
    pub pdf_storage: Option<PdfStorage>,
    pub default_sort: Option<SortSpec>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Data directory holding storage/ and blobs/
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub library: LibrarySettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibrarySettings {
    pub schema: SchemaVariant,
    pub pdf_storage: PdfStorage,
    pub default_sort: SortSpec,
}

impl LibrarySettings {
    fn from_config(config: Option<&LibraryConfig>) -> Self {
        let defaults = Self::default();
        match config {
            Some(c) => Self {
                schema: c.schema.unwrap_or(defaults.schema),
                pdf_storage: c.pdf_storage.unwrap_or(defaults.pdf_storage),
                default_sort: c.default_sort.unwrap_or(defaults.default_sort),
            },
            None => defaults,
        }
    }
}

impl ResolvedConfig {
    /// Key-value storage directory
    pub fn storage_dir(&self) -> PathBuf {
        self.home.join("storage")
    }

    /// Directory for PDF blobs
    pub fn blob_dir(&self) -> PathBuf {
        self.home.join("blobs")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
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

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let config_file = find_config_file();
    let parsed = config_file
        .as_deref()
        .map(load_config_file)
        .transpose()?;

    let home = if let Ok(env_home) = std::env::var("LEARNSHELF_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(config_path), Some(home_path)) = (
        config_file.as_deref(),
        parsed.as_ref().and_then(|c| c.paths.home.as_deref()),
    ) {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        resolve_path(config_dir, home_path)
    } else {
        default_home
    };

    let mut library = LibrarySettings::from_config(parsed.as_ref().and_then(|c| c.library.as_ref()));
    if let Ok(schema) = std::env::var("LEARNSHELF_SCHEMA") {
        library.schema = schema
            .parse()
            .with_context(|| format!("Invalid LEARNSHELF_SCHEMA: {}", schema))?;
    }

    Ok(ResolvedConfig {
        home,
        config_file,
        library,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();

        let config_path = config_dir.join(CONFIG_FILE);
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./data
library:
  schema: minimal
  pdf_storage: blob
  default_sort: favorite-first
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./data".to_string()));

        let settings = LibrarySettings::from_config(config.library.as_ref());
        assert_eq!(settings.schema, SchemaVariant::Minimal);
        assert_eq!(settings.pdf_storage, PdfStorage::Blob);
        assert_eq!(settings.default_sort, SortSpec::FavoriteFirst);
    }

    #[test]
    fn test_partial_library_section_uses_defaults() {
        let config: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
library:
  pdf_storage: inline
"#,
        )
        .unwrap();

        let settings = LibrarySettings::from_config(config.library.as_ref());
        assert_eq!(settings.schema, SchemaVariant::Rich);
        assert_eq!(settings.pdf_storage, PdfStorage::Inline);
        assert_eq!(settings.default_sort, SortSpec::Newest);
        assert!(config.paths.home.is_none());
    }

    #[test]
    fn test_derived_directories() {
        let config = ResolvedConfig {
            home: PathBuf::from("/test/.learnshelf"),
            config_file: None,
            library: LibrarySettings::default(),
        };

        assert_eq!(config.storage_dir(), PathBuf::from("/test/.learnshelf/storage"));
        assert_eq!(config.blob_dir(), PathBuf::from("/test/.learnshelf/blobs"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project/.learnshelf");

        assert_eq!(
            resolve_path(&base, "./data"),
            PathBuf::from("/home/user/project/.learnshelf/./data")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
