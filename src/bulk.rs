//! Bulk Mutation Coordinator
//!
//! Applies one action across a selection. Per-item server operations are dispatched
//! concurrently (bounded fan-out) and each settles into a tagged `ItemOutcome`; a
//! failing item never aborts the others. Once every item has settled, the combined
//! mutation is handed to the synchronizer exactly once.

use crate::album::AlbumStore;
use crate::error::GalleryError;
use crate::service::{AssetDeletion, FaceService};
use crate::sync::{Mutation, SyncReport, Synchronizer};
use crate::types::{AlbumId, AssetId, PersonId};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Action applied to every selected item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkAction {
    /// Unassign the selected assets' faces that belong to `person_id`
    UnassignFromPerson { person_id: PersonId },
    /// Merge each selected person (the selection holds person ids) into `target`
    MergeInto { target: PersonId },
    AddToAlbum { album_id: AlbumId },
    RemoveFromAlbum { album_id: AlbumId },
    Delete { permanent: bool },
}

impl BulkAction {
    fn verb(&self) -> &'static str {
        match self {
            BulkAction::UnassignFromPerson { .. } => "unassign",
            BulkAction::MergeInto { .. } => "merge",
            BulkAction::AddToAlbum { .. } => "add_to_album",
            BulkAction::RemoveFromAlbum { .. } => "remove_from_album",
            BulkAction::Delete { .. } => "delete",
        }
    }
}

/// Settled result of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded {
        affected: usize,
    },
    /// `affected` counts sub-operations that went through before the failure
    Failed {
        affected: usize,
        error: String,
        read_only_path: Option<String>,
    },
    /// Nothing qualified for this item
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub id: i64,
    pub error: String,
}

/// Aggregate result of one bulk application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    pub action: BulkAction,
    pub requested: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
    /// Sub-operations applied (faces moved, assets deleted, memberships changed)
    pub affected_count: usize,
    /// Ids whose mutation reached the server, in selection order
    pub succeeded_ids: Vec<i64>,
    pub failures: Vec<ItemFailure>,
    pub read_only_paths: Vec<String>,
    pub sync: SyncReport,
}

impl BulkOutcome {
    /// Zero successes and zero failures
    pub fn is_noop(&self) -> bool {
        self.success_count == 0 && self.failure_count == 0
    }

    pub fn all_failed(&self) -> bool {
        self.success_count == 0 && self.failure_count > 0
    }

    /// User-facing summary of the aggregate
    pub fn summary(&self) -> String {
        let n = self.requested;
        let mut text = match &self.action {
            BulkAction::UnassignFromPerson { .. } if self.is_noop() => {
                "No faces of this person were found on the selected assets".to_string()
            }
            BulkAction::UnassignFromPerson { .. } => format!(
                "Removed {} faces from {} of {} assets",
                self.affected_count, self.success_count, n
            ),
            BulkAction::MergeInto { .. } if self.is_noop() => "Nothing to merge".to_string(),
            BulkAction::MergeInto { .. } => format!(
                "Merged {} of {} people ({} faces moved)",
                self.success_count, n, self.affected_count
            ),
            BulkAction::AddToAlbum { .. } => format!(
                "Added {} of {} assets to the album ({} already present)",
                self.success_count, n, self.skipped_count
            ),
            BulkAction::RemoveFromAlbum { .. } => format!(
                "Removed {} of {} assets from the album",
                self.success_count, n
            ),
            BulkAction::Delete { .. } => format!("Deleted {} of {} assets", self.success_count, n),
        };
        if self.failure_count > 0 {
            text.push_str(&format!(", {} failed", self.failure_count));
        }
        if !self.read_only_paths.is_empty() {
            text.push_str(&format!(
                " (read-only: {})",
                self.read_only_paths.join(", ")
            ));
        }
        text
    }
}

pub struct BulkCoordinator {
    faces: Arc<dyn FaceService>,
    deletion: Arc<dyn AssetDeletion>,
    albums: AlbumStore,
    synchronizer: Arc<Synchronizer>,
    max_concurrency: usize,
}

impl BulkCoordinator {
    pub fn new(
        faces: Arc<dyn FaceService>,
        deletion: Arc<dyn AssetDeletion>,
        albums: AlbumStore,
        synchronizer: Arc<Synchronizer>,
    ) -> Self {
        Self {
            faces,
            deletion,
            albums,
            synchronizer,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Apply `action` to every id. Only a failure to start (unknown album, invalid
    /// target) is returned as an error; per-item failures are tallied.
    pub async fn apply(&self, action: BulkAction, ids: &[i64]) -> Result<BulkOutcome, GalleryError> {
        self.validate(&action)?;

        let mut seen = HashSet::new();
        let ids: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        info!(action = action.verb(), items = ids.len(), "Bulk operation started");

        let results: Vec<(i64, ItemOutcome)> = match &action {
            BulkAction::AddToAlbum { album_id } => self.add_to_album(album_id, &ids),
            BulkAction::RemoveFromAlbum { album_id } => self.remove_from_album(album_id, &ids),
            _ => self.fan_out(&action, &ids).await,
        };

        let mut outcome = BulkOutcome {
            action: action.clone(),
            requested: ids.len(),
            success_count: 0,
            failure_count: 0,
            skipped_count: 0,
            affected_count: 0,
            succeeded_ids: Vec::new(),
            failures: Vec::new(),
            read_only_paths: Vec::new(),
            sync: SyncReport::default(),
        };
        let mut touched: Vec<i64> = Vec::new();
        for (id, result) in results {
            match result {
                ItemOutcome::Succeeded { affected } => {
                    outcome.success_count += 1;
                    outcome.affected_count += affected;
                    outcome.succeeded_ids.push(id);
                    touched.push(id);
                }
                ItemOutcome::Failed {
                    affected,
                    error,
                    read_only_path,
                } => {
                    warn!(action = action.verb(), id, error = %error, "Bulk item failed");
                    outcome.failure_count += 1;
                    outcome.affected_count += affected;
                    if affected > 0 {
                        touched.push(id);
                    }
                    if let Some(path) = read_only_path {
                        outcome.read_only_paths.push(path);
                    }
                    outcome.failures.push(ItemFailure { id, error });
                }
                ItemOutcome::Skipped => outcome.skipped_count += 1,
            }
        }

        let mutation = match &action {
            BulkAction::UnassignFromPerson { person_id } => Mutation::UnassignFaces {
                person_id: *person_id,
                asset_ids: touched,
            },
            BulkAction::MergeInto { target } => Mutation::MergePersons {
                sources: touched,
                target: *target,
            },
            BulkAction::Delete { .. } => Mutation::DeleteAssets { asset_ids: touched },
            BulkAction::AddToAlbum { album_id } | BulkAction::RemoveFromAlbum { album_id } => {
                Mutation::AlbumMembership {
                    album_id: album_id.clone(),
                }
            }
        };
        outcome.sync = self.synchronizer.synchronize_after(&mutation);

        info!(
            action = action.verb(),
            succeeded = outcome.success_count,
            failed = outcome.failure_count,
            skipped = outcome.skipped_count,
            affected = outcome.affected_count,
            "Bulk operation finished"
        );
        Ok(outcome)
    }

    fn validate(&self, action: &BulkAction) -> Result<(), GalleryError> {
        match action {
            BulkAction::AddToAlbum { album_id } | BulkAction::RemoveFromAlbum { album_id } => {
                if self.albums.get(album_id).is_none() {
                    return Err(GalleryError::InvalidAction(format!(
                        "album {} does not exist",
                        album_id
                    )));
                }
            }
            BulkAction::UnassignFromPerson { person_id } if *person_id <= 0 => {
                return Err(GalleryError::InvalidAction(format!(
                    "invalid person id {}",
                    person_id
                )));
            }
            BulkAction::MergeInto { target } if *target <= 0 => {
                return Err(GalleryError::InvalidAction(format!(
                    "invalid merge target {}",
                    target
                )));
            }
            _ => {}
        }
        Ok(())
    }

    async fn fan_out(&self, action: &BulkAction, ids: &[i64]) -> Vec<(i64, ItemOutcome)> {
        let mut settled: Vec<(usize, i64, ItemOutcome)> = stream::iter(ids.iter().copied().enumerate())
            .map(|(index, id)| async move { (index, id, self.apply_item(action, id).await) })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        settled.sort_by_key(|(index, _, _)| *index);
        settled
            .into_iter()
            .map(|(_, id, outcome)| (id, outcome))
            .collect()
    }

    async fn apply_item(&self, action: &BulkAction, id: i64) -> ItemOutcome {
        match action {
            BulkAction::UnassignFromPerson { person_id } => self.unassign(id, *person_id).await,
            BulkAction::MergeInto { target } => self.merge(id, *target).await,
            BulkAction::Delete { permanent } => self.delete(id, *permanent).await,
            BulkAction::AddToAlbum { .. } | BulkAction::RemoveFromAlbum { .. } => {
                ItemOutcome::Skipped
            }
        }
    }

    async fn unassign(&self, asset_id: AssetId, person_id: PersonId) -> ItemOutcome {
        let faces = match self.faces.faces_for_asset(asset_id).await {
            Ok(faces) => faces,
            Err(e) => return failed(0, e),
        };
        let matching: Vec<_> = faces
            .into_iter()
            .filter(|f| f.person_id == Some(person_id))
            .collect();
        if matching.is_empty() {
            debug!(asset_id, person_id, "No matching faces");
            return ItemOutcome::Skipped;
        }

        let results =
            futures::future::join_all(matching.iter().map(|f| self.faces.assign_face(f.id, None)))
                .await;
        let affected = results.iter().filter(|r| r.is_ok()).count();
        match results.into_iter().find_map(Result::err) {
            Some(e) => failed(affected, e),
            None => ItemOutcome::Succeeded { affected },
        }
    }

    async fn merge(&self, source: PersonId, target: PersonId) -> ItemOutcome {
        if source == target {
            return ItemOutcome::Skipped;
        }
        match self.faces.merge_person(source, target).await {
            Ok(outcome) => {
                debug!(
                    source,
                    target,
                    faces_moved = outcome.faces_moved,
                    target_face_count = ?outcome.target_face_count,
                    "Person merged"
                );
                ItemOutcome::Succeeded {
                    affected: outcome.faces_moved as usize,
                }
            }
            Err(e) => failed(0, e),
        }
    }

    async fn delete(&self, asset_id: AssetId, permanent: bool) -> ItemOutcome {
        match self.deletion.delete_asset(asset_id, permanent).await {
            Ok(outcome) if outcome.success => ItemOutcome::Succeeded { affected: 1 },
            Ok(outcome) => {
                let error = match &outcome.read_only_path {
                    Some(path) => format!("file is read-only: {}", path),
                    None => "server refused the deletion".to_string(),
                };
                ItemOutcome::Failed {
                    affected: 0,
                    error,
                    read_only_path: outcome.read_only_path,
                }
            }
            Err(e) => failed(0, e),
        }
    }

    fn add_to_album(&self, album_id: &str, ids: &[i64]) -> Vec<(i64, ItemOutcome)> {
        let existing: HashSet<AssetId> = self
            .albums
            .get(album_id)
            .map(|a| a.asset_ids.into_iter().collect())
            .unwrap_or_default();
        self.albums.add_assets(album_id, ids);
        ids.iter()
            .map(|id| {
                let outcome = if existing.contains(id) {
                    ItemOutcome::Skipped
                } else {
                    ItemOutcome::Succeeded { affected: 1 }
                };
                (*id, outcome)
            })
            .collect()
    }

    fn remove_from_album(&self, album_id: &str, ids: &[i64]) -> Vec<(i64, ItemOutcome)> {
        let existing: HashSet<AssetId> = self
            .albums
            .get(album_id)
            .map(|a| a.asset_ids.into_iter().collect())
            .unwrap_or_default();
        self.albums.remove_assets(album_id, ids);
        ids.iter()
            .map(|id| {
                let outcome = if existing.contains(id) {
                    ItemOutcome::Succeeded { affected: 1 }
                } else {
                    ItemOutcome::Skipped
                };
                (*id, outcome)
            })
            .collect()
    }
}

fn failed(affected: usize, error: GalleryError) -> ItemOutcome {
    ItemOutcome::Failed {
        affected,
        error: error.to_string(),
        read_only_path: None,
    }
}
