//! Shared presentation helpers: headings, timestamps, json rendering.

use crate::error::{GalleryError, StorageError};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;

pub fn heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Epoch milliseconds as `YYYY-MM-DD HH:MM` UTC, or `-` when out of range.
pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, GalleryError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| GalleryError::StorageError(StorageError::Serialization(e)))
}
