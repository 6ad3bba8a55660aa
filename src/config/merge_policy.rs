//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

use super::{default_store_path, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS};
use crate::album::{DEFAULT_ALBUMS_KEY, DEFAULT_LEGACY_ALBUMS_KEY};
use crate::bulk::DEFAULT_MAX_CONCURRENCY;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.base_url", DEFAULT_BASE_URL)?
        .set_default("server.timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
        .set_default("server.page_size", DEFAULT_PAGE_SIZE as i64)?
        .set_default(
            "store.path",
            default_store_path().to_string_lossy().to_string(),
        )?
        .set_default("store.albums_key", DEFAULT_ALBUMS_KEY)?
        .set_default("store.legacy_albums_key", DEFAULT_LEGACY_ALBUMS_KEY)?
        .set_default("bulk.max_concurrency", DEFAULT_MAX_CONCURRENCY as i64)?
        .set_default("albums.prune_deleted_assets", false)
}
