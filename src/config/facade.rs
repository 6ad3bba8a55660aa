//! Config loader facade: defaults, global file, workspace files, environment.

use super::merge_policy::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::GalleryConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest first: built-in defaults, global config file,
    /// `config/config.toml`, `config/{GALLERY_ENV}.toml`, `GALLERY__*` env vars.
    pub fn load(workspace_root: &Path) -> Result<GalleryConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: GalleryConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace = %workspace_root.display(),
            base_url = %config.server.base_url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load configuration from one explicit file, on top of defaults.
    pub fn load_from_file(path: &Path) -> Result<GalleryConfig, ConfigError> {
        builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .build()?
            .try_deserialize()
    }

    /// Location of the global config file, if a home directory is known.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
