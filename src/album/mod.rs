//! Album Store
//!
//! Albums are client-owned groupings of asset identifiers. The whole collection is
//! persisted as one JSON record and held in memory after the first read; every
//! mutation rewrites that record. Reads and writes degrade gracefully: an unreadable
//! record reads as an empty collection and a failed write is logged and swallowed.

pub mod id;
pub mod persistence;

pub use id::generate_album_id;
pub use persistence::{MemoryRecordBackend, RecordBackend, SledRecordBackend};

use crate::error::{GalleryError, StorageError};
use crate::types::{now_millis, AlbumId, AssetId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_ALBUMS_KEY: &str = "gallery.albums.v2";
pub const DEFAULT_LEGACY_ALBUMS_KEY: &str = "gallery.albums";

/// A named grouping of asset identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Soft references; membership does not imply the asset still exists.
    #[serde(default)]
    pub asset_ids: Vec<AssetId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Album {
    pub fn contains(&self, asset_id: AssetId) -> bool {
        self.asset_ids.contains(&asset_id)
    }

    fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }
}

/// Partial update for `AlbumStore::update`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
}

impl AlbumPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: None,
        }
    }

    pub fn describe(description: Option<String>) -> Self {
        Self {
            name: None,
            description: Some(description),
        }
    }
}

/// Record keys used by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumKeys {
    pub current: String,
    pub legacy: String,
}

impl Default for AlbumKeys {
    fn default() -> Self {
        Self {
            current: DEFAULT_ALBUMS_KEY.to_string(),
            legacy: DEFAULT_LEGACY_ALBUMS_KEY.to_string(),
        }
    }
}

/// Loaded album collection held by the store
#[derive(Debug, Default)]
struct Collection {
    albums: Vec<Album>,
    /// Legacy record still present; removed after the next successful write
    legacy_pending: bool,
}

/// Repository over the persisted album collection. Sole writer of album records.
///
/// The collection is loaded once and kept in memory. Mutations write through to the
/// backend; a failed write leaves the in-memory state in place.
#[derive(Clone)]
pub struct AlbumStore {
    backend: Arc<dyn RecordBackend>,
    keys: AlbumKeys,
    state: Arc<Mutex<Option<Collection>>>,
}

impl AlbumStore {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self::with_keys(backend, AlbumKeys::default())
    }

    pub fn with_keys(backend: Arc<dyn RecordBackend>, keys: AlbumKeys) -> Self {
        Self {
            backend,
            keys,
            state: Arc::new(Mutex::new(None)),
        }
    }

    pub fn keys(&self) -> &AlbumKeys {
        &self.keys
    }

    pub fn list(&self) -> Vec<Album> {
        self.read(|albums| albums.to_vec())
    }

    pub fn get(&self, id: &str) -> Option<Album> {
        self.read(|albums| albums.iter().find(|a| a.id == id).cloned())
    }

    /// Create an album. Fails with `Validation` when the name trims to empty.
    pub fn create(&self, name: &str, description: Option<&str>) -> Result<Album, GalleryError> {
        let name = validate_name(name)?;
        let now = now_millis();
        let album = Album {
            id: generate_album_id(),
            name,
            description: normalize_description(description),
            asset_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.write(|collection| {
            collection.albums.push(album.clone());
            true
        });
        info!(album_id = %album.id, name = %album.name, "Album created");
        Ok(album)
    }

    /// Rename and/or re-describe an album. `Ok(None)` when the id is unknown.
    pub fn update(&self, id: &str, patch: AlbumPatch) -> Result<Option<Album>, GalleryError> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        self.mutate(id, |album| {
            if let Some(name) = name {
                album.name = name;
            }
            if let Some(description) = patch.description {
                album.description = normalize_description(description.as_deref());
            }
        })
        .map(Ok)
        .transpose()
    }

    /// Delete an album. Returns false when the id is unknown.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.write(|collection| {
            let before = collection.albums.len();
            collection.albums.retain(|a| a.id != id);
            collection.albums.len() != before
        });
        if removed {
            info!(album_id = %id, "Album deleted");
        }
        removed
    }

    /// Set-union of `asset_ids` into the album membership.
    pub fn add_assets(&self, album_id: &str, asset_ids: &[AssetId]) -> Option<Album> {
        self.mutate(album_id, |album| {
            let mut present: HashSet<AssetId> = album.asset_ids.iter().copied().collect();
            for id in asset_ids {
                if present.insert(*id) {
                    album.asset_ids.push(*id);
                }
            }
        })
    }

    /// Set-difference of `asset_ids` from the album membership.
    pub fn remove_assets(&self, album_id: &str, asset_ids: &[AssetId]) -> Option<Album> {
        let removing: HashSet<AssetId> = asset_ids.iter().copied().collect();
        self.mutate(album_id, |album| {
            album.asset_ids.retain(|id| !removing.contains(id));
        })
    }

    pub fn albums_containing(&self, asset_id: AssetId) -> Vec<Album> {
        self.read(|albums| {
            albums
                .iter()
                .filter(|a| a.contains(asset_id))
                .cloned()
                .collect()
        })
    }

    fn mutate<F>(&self, id: &str, apply: F) -> Option<Album>
    where
        F: FnOnce(&mut Album),
    {
        let mut updated = None;
        self.write(|collection| {
            let Some(album) = collection.albums.iter_mut().find(|a| a.id == id) else {
                return false;
            };
            apply(album);
            album.touch();
            updated = Some(album.clone());
            true
        });
        if let Some(album) = &updated {
            debug!(album_id = %id, assets = album.asset_ids.len(), "Album updated");
        }
        updated
    }

    /// Run `view` over the collection. A backend read failure reads as empty and is
    /// not cached, so the next call retries the backend.
    fn read<R>(&self, view: impl FnOnce(&[Album]) -> R) -> R {
        let mut state = self.state.lock();
        if state.is_none() {
            *state = self.load();
        }
        match state.as_ref() {
            Some(collection) => view(&collection.albums),
            None => view(&[]),
        }
    }

    /// Apply `change` to the in-memory collection and persist it when `change`
    /// reports a modification. The in-memory state is kept even if persisting fails.
    fn write(&self, change: impl FnOnce(&mut Collection) -> bool) -> bool {
        let mut state = self.state.lock();
        if state.is_none() {
            *state = self.load();
        }
        let collection = state.get_or_insert_with(Collection::default);
        let changed = change(collection);
        if changed {
            self.persist(collection);
        }
        changed
    }

    /// Read the current record, migrating the legacy record on first read.
    /// `None` means the backend could not be read.
    fn load(&self) -> Option<Collection> {
        match self.backend.read(&self.keys.current) {
            Ok(Some(raw)) => match serde_json::from_slice(&raw) {
                Ok(albums) => Some(Collection {
                    albums,
                    legacy_pending: false,
                }),
                Err(e) => {
                    warn!(key = %self.keys.current, error = %e, "Unparsable album record, reading as empty");
                    Some(Collection::default())
                }
            },
            Ok(None) => self.migrate_legacy(),
            Err(e) => {
                warn!(key = %self.keys.current, error = %e, "Album record read failed, reading as empty");
                None
            }
        }
    }

    fn migrate_legacy(&self) -> Option<Collection> {
        let raw = match self.backend.read(&self.keys.legacy) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some(Collection::default()),
            Err(e) => {
                warn!(key = %self.keys.legacy, error = %e, "Legacy album record read failed");
                return None;
            }
        };

        let albums: Vec<Album> = match serde_json::from_slice(&raw) {
            Ok(albums) => albums,
            Err(e) => {
                warn!(key = %self.keys.legacy, error = %e, "Legacy album record unparsable, skipping migration");
                return Some(Collection::default());
            }
        };

        let mut collection = Collection {
            albums,
            legacy_pending: true,
        };
        if self.persist(&mut collection) {
            info!(
                from = %self.keys.legacy,
                to = %self.keys.current,
                albums = collection.albums.len(),
                "Migrated legacy album record"
            );
        } else {
            warn!(key = %self.keys.legacy, "Legacy album record kept until the migrated collection is written");
        }
        Some(collection)
    }

    /// Persist the whole collection. Failures are logged and swallowed; the legacy
    /// record is only removed once the current record has been written.
    fn persist(&self, collection: &mut Collection) -> bool {
        if let Err(e) = self.try_save(&collection.albums) {
            warn!(key = %self.keys.current, error = %e, "Failed to persist album collection");
            return false;
        }
        if collection.legacy_pending {
            match self.backend.remove(&self.keys.legacy) {
                Ok(()) => collection.legacy_pending = false,
                Err(e) => {
                    warn!(key = %self.keys.legacy, error = %e, "Failed to remove legacy album record")
                }
            }
        }
        true
    }

    fn try_save(&self, albums: &[Album]) -> Result<(), StorageError> {
        let raw = serde_json::to_vec(albums)?;
        self.backend.write(&self.keys.current, &raw)
    }
}

fn validate_name(name: &str) -> Result<String, GalleryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GalleryError::Validation(
            "Album name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
