//! Gallery Sync: client-side convergence for a paginated media gallery
//!
//! Keeps locally cached server views consistent after mutations, resolves album
//! membership against incrementally loaded pages, and applies bulk actions with
//! partial-failure tolerance.

pub mod album;
pub mod bulk;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod gallery;
pub mod loader;
pub mod logging;
pub mod service;
pub mod sync;
pub mod types;

pub use error::GalleryError;
pub use gallery::{AlbumView, Gallery, GalleryOptions};
