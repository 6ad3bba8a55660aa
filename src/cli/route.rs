//! CLI route: single route table and run context. Dispatches to the album store and presentation.

use crate::album::{AlbumKeys, AlbumPatch, AlbumStore, SledRecordBackend};
use crate::cli::help::{command_name, is_mutating};
use crate::cli::parse::{AlbumCommands, Commands, OutputFormat};
use crate::cli::presentation::{
    format_album_deleted, format_album_json, format_album_list_json, format_album_list_text,
    format_album_text, format_containing_json, format_containing_text,
};
use crate::config::{ConfigLoader, GalleryConfig};
use crate::error::GalleryError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace, loaded config, and the album store.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config_path: Option<PathBuf>,
    config: GalleryConfig,
    store_path: PathBuf,
    backend: Arc<SledRecordBackend>,
    albums: AlbumStore,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, GalleryError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        let config = config.validated()?;

        let store_path = config.store.resolved_path(&workspace_root);
        std::fs::create_dir_all(&store_path)
            .map_err(|e| GalleryError::StorageError(crate::error::StorageError::IoError(e)))?;
        let backend = Arc::new(SledRecordBackend::new(&store_path)?);
        let albums = AlbumStore::with_keys(
            backend.clone(),
            AlbumKeys {
                current: config.store.albums_key.clone(),
                legacy: config.store.legacy_albums_key.clone(),
            },
        );
        debug!(store = %store_path.display(), "Album store opened");

        Ok(Self {
            workspace_root,
            config_path,
            config,
            store_path,
            backend,
            albums,
        })
    }

    pub fn workspace_root(&self) -> &PathBuf {
        &self.workspace_root
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn store_path(&self) -> &PathBuf {
        &self.store_path
    }

    pub fn albums(&self) -> &AlbumStore {
        &self.albums
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands, format: OutputFormat) -> Result<String, GalleryError> {
        let started = Instant::now();
        let name = command_name(command);
        let result = self.execute_inner(command, format);
        if is_mutating(command) {
            self.backend.flush()?;
        }
        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands, format: OutputFormat) -> Result<String, GalleryError> {
        match command {
            Commands::Album { command } => self.handle_album(command, format),
            Commands::Config => self.handle_config(),
        }
    }

    fn handle_album(&self, command: &AlbumCommands, format: OutputFormat) -> Result<String, GalleryError> {
        let json_output = format == OutputFormat::Json;
        match command {
            AlbumCommands::List => {
                let albums = self.albums.list();
                if json_output {
                    format_album_list_json(&albums)
                } else {
                    Ok(format_album_list_text(&albums))
                }
            }
            AlbumCommands::Show { id } => {
                let album = self.albums.get(id).ok_or_else(|| album_not_found(id))?;
                render_album(&album, json_output)
            }
            AlbumCommands::Create { name, description } => {
                let album = self.albums.create(name, description.as_deref())?;
                render_album(&album, json_output)
            }
            AlbumCommands::Rename { id, name } => {
                let album = self
                    .albums
                    .update(id, AlbumPatch::rename(name.clone()))?
                    .ok_or_else(|| album_not_found(id))?;
                render_album(&album, json_output)
            }
            AlbumCommands::Describe { id, text } => {
                let album = self
                    .albums
                    .update(id, AlbumPatch::describe(text.clone()))?
                    .ok_or_else(|| album_not_found(id))?;
                render_album(&album, json_output)
            }
            AlbumCommands::Delete { id } => {
                if !self.albums.delete(id) {
                    return Err(album_not_found(id));
                }
                format_album_deleted(id, json_output)
            }
            AlbumCommands::Add { id, assets } => {
                let album = self
                    .albums
                    .add_assets(id, assets)
                    .ok_or_else(|| album_not_found(id))?;
                render_album(&album, json_output)
            }
            AlbumCommands::Remove { id, assets } => {
                let album = self
                    .albums
                    .remove_assets(id, assets)
                    .ok_or_else(|| album_not_found(id))?;
                render_album(&album, json_output)
            }
            AlbumCommands::Containing { asset } => {
                let albums = self.albums.albums_containing(*asset);
                if json_output {
                    format_containing_json(*asset, &albums)
                } else {
                    Ok(format_containing_text(*asset, &albums))
                }
            }
        }
    }

    fn handle_config(&self) -> Result<String, GalleryError> {
        let mut out = String::new();
        if let Some(path) = &self.config_path {
            out.push_str(&format!("# loaded from {}\n", path.display()));
        }
        let rendered = toml::to_string_pretty(&self.config)
            .map_err(|e| GalleryError::ConfigError(format!("Failed to render config: {}", e)))?;
        out.push_str(&rendered);
        Ok(out)
    }
}

fn render_album(album: &crate::album::Album, json_output: bool) -> Result<String, GalleryError> {
    if json_output {
        format_album_json(album)
    } else {
        Ok(format_album_text(album))
    }
}

fn album_not_found(id: &str) -> GalleryError {
    GalleryError::NotFound(format!("album {}", id))
}
