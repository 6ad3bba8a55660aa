//! Configuration System
//!
//! Layered configuration for the gallery client: built-in defaults, the global
//! config file, workspace config files, then `GALLERY__`-prefixed environment
//! variables. Validation reports every problem at once.

use crate::album::{DEFAULT_ALBUMS_KEY, DEFAULT_LEGACY_ALBUMS_KEY};
use crate::bulk::DEFAULT_MAX_CONCURRENCY;
use crate::error::GalleryError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge_policy;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub bulk: BulkConfig,

    #[serde(default)]
    pub albums: AlbumPolicyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gallery server connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Assets requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_PAGE_SIZE: usize = 100;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

/// Album record storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    #[serde(default = "default_albums_key")]
    pub albums_key: String,

    #[serde(default = "default_legacy_albums_key")]
    pub legacy_albums_key: String,
}

/// Platform data directory for the album database, falling back to the workspace.
pub fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("org", "gallery", "gallery-sync")
        .map(|dirs| dirs.data_dir().join("albums"))
        .unwrap_or_else(|| PathBuf::from(".gallery/albums"))
}

fn default_albums_key() -> String {
    DEFAULT_ALBUMS_KEY.to_string()
}

fn default_legacy_albums_key() -> String {
    DEFAULT_LEGACY_ALBUMS_KEY.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            albums_key: default_albums_key(),
            legacy_albums_key: default_legacy_albums_key(),
        }
    }
}

impl StoreConfig {
    /// Store path resolved against the workspace root when relative
    pub fn resolved_path(&self, workspace_root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            workspace_root.join(&self.path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Per-item operations dispatched at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlbumPolicyConfig {
    /// Drop deleted assets from albums instead of keeping soft references
    #[serde(default)]
    pub prune_deleted_assets: bool,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    Server(String),
    Store(String),
    Bulk(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::Server(msg) => write!(f, "Server: {}", msg),
            ConfigValidationError::Store(msg) => write!(f, "Store: {}", msg),
            ConfigValidationError::Bulk(msg) => write!(f, "Bulk: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

impl GalleryConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if !(self.server.base_url.starts_with("http://")
            || self.server.base_url.starts_with("https://"))
        {
            errors.push(ConfigValidationError::Server(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.server.base_url
            )));
        }
        if self.server.page_size == 0 {
            errors.push(ConfigValidationError::Server(
                "page_size must be at least 1".to_string(),
            ));
        }

        if self.store.path.as_os_str().is_empty() {
            errors.push(ConfigValidationError::Store(
                "Store path cannot be empty".to_string(),
            ));
        }
        if self.store.albums_key.trim().is_empty() {
            errors.push(ConfigValidationError::Store(
                "albums_key cannot be empty".to_string(),
            ));
        }
        if self.store.albums_key == self.store.legacy_albums_key {
            errors.push(ConfigValidationError::Store(
                "albums_key and legacy_albums_key must differ".to_string(),
            ));
        }

        if self.bulk.max_concurrency == 0 {
            errors.push(ConfigValidationError::Bulk(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding all problems into one configuration error
    pub fn validated(self) -> Result<Self, GalleryError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            GalleryError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}
