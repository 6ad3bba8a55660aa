//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::GalleryError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &GalleryError) -> String {
    match e {
        GalleryError::NotFound(what) => format!("Not found: {}", what),
        GalleryError::Validation(msg) => format!("Invalid input: {}", msg),
        GalleryError::ConfigError(msg) => format!("Configuration problem: {}", msg),
        other => other.to_string(),
    }
}

/// Process exit code for a failed command
pub fn exit_code(e: &GalleryError) -> i32 {
    match e {
        GalleryError::NotFound(_) => 3,
        GalleryError::Validation(_) | GalleryError::InvalidAction(_) => 2,
        _ => 1,
    }
}
