//! Configuration module for docsense.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.docsense/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the binary)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCSENSE_` and use double
//! underscores to separate nested levels:
//! - `DOCSENSE_SEARCH__DEFAULT_TOP_K=10` sets `search.default_top_k`
//! - `DOCSENSE_EMBEDDING__BACKEND=fastembed` sets `embedding.backend`
//! - `DOCSENSE_DOCS_DIR=corpus` sets `docs_dir`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".docsense";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "DOCSENSE_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the `*.txt` corpus
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// SQLite embedding cache file
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Workspace root directory (where .docsense is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Which encoder produces embeddings.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Deterministic feature hashing, no model download
    #[default]
    Hashing,
    /// Sentence embeddings via fastembed (requires the `fastembed` feature)
    Fastembed,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Model name for the fastembed backend
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension for the hashing backend
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum texts per encoder call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Where downloaded models are stored
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind address for the HTTP adapter
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

fn default_version() -> u32 {
    1
}
fn default_docs_dir() -> PathBuf {
    PathBuf::from("data/docs")
}
fn default_cache_path() -> PathBuf {
    PathBuf::from("data/cache/embeddings.db")
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_dimension() -> usize {
    crate::vector::VECTOR_DIMENSION_384
}
fn default_batch_size() -> usize {
    crate::vector::DEFAULT_BATCH_SIZE
}
fn default_models_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("docsense").join("models"))
        .unwrap_or_else(|| PathBuf::from(".docsense/models"))
}
fn default_top_k() -> usize {
    5
}
fn default_preview_chars() -> usize {
    crate::search::explain::DEFAULT_PREVIEW_CHARS
}
fn default_max_keywords() -> usize {
    crate::search::explain::DEFAULT_MAX_KEYWORDS
}
fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            docs_dir: default_docs_dir(),
            cache_path: default_cache_path(),
            workspace_root: None,
            debug: false,
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            models_dir: default_models_dir(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            preview_chars: default_preview_chars(),
            max_keywords: default_max_keywords(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

/// `DOCSENSE_A__B` becomes the key `a.b`; single underscores stay in field names.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().replace("__", ".").into())
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    ///
    /// Relative paths resolve against the workspace owning that file: the
    /// parent of its `.docsense` directory, or the file's own directory.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let path = path.as_ref();
        Self::figment(path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root_of(path);
                }
                settings
            })
    }

    fn workspace_root_of(config_path: &Path) -> Option<PathBuf> {
        let config_dir = config_path.parent()?;
        let root = if config_dir.file_name() == Some(OsStr::new(CONFIG_DIR)) {
            config_dir.parent()?
        } else {
            config_dir
        };
        Some(root.to_path_buf())
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(env_provider())
    }

    /// Find the workspace config by looking for a .docsense directory
    /// from the current directory up to root
    pub fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .docsense is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Resolves a configured path against the workspace root, if one is known.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Corpus directory after workspace resolution
    pub fn docs_path(&self) -> PathBuf {
        self.resolve_path(&self.docs_dir)
    }

    /// Cache file after workspace resolution
    pub fn cache_file(&self) -> PathBuf {
        self.resolve_path(&self.cache_path)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);
        Self::write_template(&config_path, force)?;
        Ok(config_path)
    }

    fn write_template(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let defaults = Settings::default();
        let template = format!(
            r#"# docsense configuration file

# Version of the configuration schema
version = {version}

# Directory with one *.txt file per document (relative to the workspace root)
docs_dir = "{docs_dir}"

# SQLite file holding cached embeddings
cache_path = "{cache_path}"

# Global debug mode
debug = false

[embedding]
# "hashing" (built in) or "fastembed" (requires the fastembed feature)
backend = "hashing"

# Model used by the fastembed backend
model = "{model}"

# Vector dimension of the hashing backend
dimension = {dimension}

# Maximum number of documents per encoder call
batch_size = {batch_size}

[search]
# Results returned when no limit is given
default_top_k = {top_k}

# Characters shown in result previews
preview_chars = {preview_chars}

# Overlapping keywords reported per result
max_keywords = {max_keywords}

[server]
# Address for `docsense serve`
bind = "{bind}"
"#,
            version = defaults.version,
            docs_dir = defaults.docs_dir.display(),
            cache_path = defaults.cache_path.display(),
            model = defaults.embedding.model,
            dimension = defaults.embedding.dimension,
            batch_size = defaults.embedding.batch_size,
            top_k = defaults.search.default_top_k,
            preview_chars = defaults.search.preview_chars,
            max_keywords = defaults.search.max_keywords,
            bind = defaults.server.bind,
        );

        std::fs::write(config_path, template)?;
        Ok(())
    }
}
