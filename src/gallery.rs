//! Gallery facade
//!
//! The surface the presentation layer talks to: mutation synchronization, album
//! resolution against the default gallery view, bulk actions, and album CRUD.
//! Wires one `QueryCache` through the synchronizer, loader, and bulk coordinator.

use crate::album::{Album, AlbumKeys, AlbumPatch, AlbumStore, SledRecordBackend};
use crate::bulk::{BulkAction, BulkCoordinator, BulkOutcome, DEFAULT_MAX_CONCURRENCY};
use crate::cache::{ActiveView, CacheKey, QueryCache};
use crate::config::GalleryConfig;
use crate::error::GalleryError;
use crate::loader::{DependentLoader, Resolution};
use crate::service::{AssetDeletion, AssetQuery, FaceService, GalleryBackend, HttpGalleryClient};
use crate::sync::{Mutation, SyncReport, Synchronizer};
use crate::types::{Asset, AssetId, PersonId};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runtime knobs taken from `GalleryConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryOptions {
    pub page_size: usize,
    pub max_concurrency: usize,
    pub prune_deleted_assets: bool,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            prune_deleted_assets: false,
        }
    }
}

impl GalleryOptions {
    pub fn from_config(config: &GalleryConfig) -> Self {
        Self {
            page_size: config.server.page_size,
            max_concurrency: config.bulk.max_concurrency,
            prune_deleted_assets: config.albums.prune_deleted_assets,
        }
    }
}

/// An album with its members resolved against the loaded gallery pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumView {
    pub album: Album,
    /// Resolved members, in gallery order
    pub assets: Vec<Asset>,
    /// Members the exhausted gallery never produced
    pub broken: Vec<AssetId>,
    /// Members not loaded yet while more pages remain
    pub pending: Vec<AssetId>,
}

pub struct Gallery {
    albums: AlbumStore,
    cache: Arc<QueryCache>,
    synchronizer: Arc<Synchronizer>,
    loader: DependentLoader,
    bulk: BulkCoordinator,
    options: GalleryOptions,
}

impl Gallery {
    pub fn new<B>(albums: AlbumStore, backend: Arc<B>, options: GalleryOptions) -> Self
    where
        B: GalleryBackend + 'static,
    {
        let cache = Arc::new(QueryCache::new());
        let synchronizer = Arc::new(Synchronizer::new(cache.clone()));
        let query: Arc<dyn AssetQuery> = backend.clone();
        let faces: Arc<dyn FaceService> = backend.clone();
        let deletion: Arc<dyn AssetDeletion> = backend;

        let loader = DependentLoader::new(cache.clone(), query, options.page_size);
        let bulk = BulkCoordinator::new(faces, deletion, albums.clone(), synchronizer.clone())
            .with_max_concurrency(options.max_concurrency);

        Self {
            albums,
            cache,
            synchronizer,
            loader,
            bulk,
            options,
        }
    }

    /// Connect to the configured server with albums in the configured sled store.
    pub fn connect(config: &GalleryConfig, workspace_root: &Path) -> Result<Self, GalleryError> {
        let store_path = config.store.resolved_path(workspace_root);
        let backend = SledRecordBackend::new(&store_path)?;
        let albums = AlbumStore::with_keys(
            Arc::new(backend),
            AlbumKeys {
                current: config.store.albums_key.clone(),
                legacy: config.store.legacy_albums_key.clone(),
            },
        );
        let client = Arc::new(HttpGalleryClient::from_config(&config.server)?);
        info!(
            store = %store_path.display(),
            server = %client.base_url(),
            "Gallery connected"
        );
        Ok(Self::new(albums, client, GalleryOptions::from_config(config)))
    }

    pub fn albums(&self) -> &AlbumStore {
        &self.albums
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.synchronizer
    }

    pub fn loader(&self) -> &DependentLoader {
        &self.loader
    }

    pub fn options(&self) -> &GalleryOptions {
        &self.options
    }

    pub fn active_view(&self) -> ActiveView {
        self.synchronizer.active_view()
    }

    pub fn open_view(&self, key: CacheKey) {
        debug!(key = %key, "View opened");
        self.synchronizer.set_active_view(ActiveView::showing(key));
    }

    /// Show the assets of one person
    pub fn pin_person(&self, person_id: PersonId) {
        self.open_view(CacheKey::person_assets(person_id));
    }

    /// Reconcile the cache after a mutation completed elsewhere. An invalidated or
    /// redirected active view is refetched before returning.
    pub async fn synchronize_after(&self, mutation: &Mutation) -> SyncReport {
        let report = self.synchronizer.synchronize_after(mutation);
        self.refetch_active(&report).await;
        report
    }

    /// Load gallery pages until every member of the album is resolvable or the
    /// server runs out. `None` when the album does not exist.
    pub async fn ensure_album_resolved(&self, album_id: &str) -> Option<Resolution> {
        let album = self.albums.get(album_id)?;
        let target: HashSet<AssetId> = album.asset_ids.iter().copied().collect();
        let resolution = self
            .loader
            .ensure_resolved(&CacheKey::gallery(), &target)
            .await;
        debug!(
            album_id,
            fetched = resolution.fetched(),
            missing = resolution.missing().len(),
            "Album resolution finished"
        );
        Some(resolution)
    }

    /// Album members split into resolved, broken, and still pending.
    pub fn album_view(&self, album_id: &str) -> Option<AlbumView> {
        let album = self.albums.get(album_id)?;
        let members: HashSet<AssetId> = album.asset_ids.iter().copied().collect();
        let entry = self.cache.snapshot(&CacheKey::gallery());

        let assets: Vec<Asset> = entry
            .as_ref()
            .map(|e| {
                e.assets()
                    .into_iter()
                    .filter(|a| members.contains(&a.id))
                    .collect()
            })
            .unwrap_or_default();
        let loaded: HashSet<AssetId> = assets.iter().map(|a| a.id).collect();
        let unresolved: Vec<AssetId> = album
            .asset_ids
            .iter()
            .copied()
            .filter(|id| !loaded.contains(id))
            .collect();

        let exhausted = entry
            .as_ref()
            .map_or(false, |e| !e.has_more() && !e.is_stale());
        let (broken, pending) = if exhausted {
            (unresolved, Vec::new())
        } else {
            (Vec::new(), unresolved)
        };

        Some(AlbumView {
            album,
            assets,
            broken,
            pending,
        })
    }

    /// Apply a bulk action. Deleted assets are pruned from albums when configured,
    /// and the active view is refetched if the reconciliation touched it.
    pub async fn apply_bulk(
        &self,
        action: BulkAction,
        ids: &[i64],
    ) -> Result<BulkOutcome, GalleryError> {
        let outcome = self.bulk.apply(action, ids).await?;

        if self.options.prune_deleted_assets
            && matches!(outcome.action, BulkAction::Delete { .. })
            && !outcome.succeeded_ids.is_empty()
        {
            self.prune_albums(&outcome.succeeded_ids);
        }

        self.refetch_active(&outcome.sync).await;
        Ok(outcome)
    }

    pub fn list_albums(&self) -> Vec<Album> {
        self.albums.list()
    }

    pub fn get_album(&self, id: &str) -> Option<Album> {
        self.albums.get(id)
    }

    pub fn create_album(&self, name: &str, description: Option<&str>) -> Result<Album, GalleryError> {
        self.albums.create(name, description)
    }

    pub fn update_album(&self, id: &str, patch: AlbumPatch) -> Result<Option<Album>, GalleryError> {
        self.albums.update(id, patch)
    }

    pub fn delete_album(&self, id: &str) -> bool {
        self.albums.delete(id)
    }

    pub fn add_to_album(&self, album_id: &str, asset_ids: &[AssetId]) -> Option<Album> {
        self.albums.add_assets(album_id, asset_ids)
    }

    pub fn remove_from_album(&self, album_id: &str, asset_ids: &[AssetId]) -> Option<Album> {
        self.albums.remove_assets(album_id, asset_ids)
    }

    pub fn albums_containing(&self, asset_id: AssetId) -> Vec<Album> {
        self.albums.albums_containing(asset_id)
    }

    fn prune_albums(&self, deleted: &[AssetId]) {
        let deleted_set: HashSet<AssetId> = deleted.iter().copied().collect();
        for album in self.albums.list() {
            if album.asset_ids.iter().any(|id| deleted_set.contains(id)) {
                self.albums.remove_assets(&album.id, deleted);
                debug!(album_id = %album.id, "Pruned deleted assets from album");
            }
        }
    }

    async fn refetch_active(&self, report: &SyncReport) {
        let Some(key) = &report.refetch_now else {
            return;
        };
        match self.loader.refetch(key).await {
            Ok(true) => debug!(key = %key, "Active view refetched"),
            Ok(false) => debug!(key = %key, "Active view fetch already in flight"),
            Err(e) => warn!(key = %key, error = %e, "Active view refetch failed"),
        }
    }
}
