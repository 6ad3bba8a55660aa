//! Error types for the gallery synchronization layer.

use thiserror::Error;

/// Storage-related errors raised by record backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record backend error: {0}")]
    Backend(String),

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Errors surfaced by the gallery core
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for GalleryError {
    fn from(err: config::ConfigError) -> Self {
        GalleryError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for GalleryError {
    fn from(err: reqwest::Error) -> Self {
        GalleryError::Transport(err.to_string())
    }
}
