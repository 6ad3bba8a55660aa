//! Cache Synchronizer
//!
//! Decides, for one completed mutation, which cached views are stale and how to
//! reconcile them:
//!
//! - delete: filter the asset out of every entry in place (no refetch)
//! - unassign: invalidate entries scoped to the person that hold the asset, plus the
//!   unassigned-faces and face-progress aggregates
//! - merge: invalidate entries scoped to the source or target and every person
//!   aggregate, then redirect a view pinned to the source
//! - album membership: nothing (albums never touch the query cache)
//!
//! All changes for one mutation are applied under a single cache write lock.
//! Invalidated entries are refetched lazily, except the active view, which the
//! report flags for an immediate refetch.

use crate::cache::{ActiveView, CacheKey, QueryCache, Resource};
use crate::types::{AlbumId, AssetId, PersonId};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    DeleteAssets,
    UnassignFaces,
    MergePersons,
    AlbumMembership,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::DeleteAssets => "delete_assets",
            MutationKind::UnassignFaces => "unassign_faces",
            MutationKind::MergePersons => "merge_persons",
            MutationKind::AlbumMembership => "album_membership",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed mutation, carrying the union of affected scopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    DeleteAssets {
        asset_ids: Vec<AssetId>,
    },
    UnassignFaces {
        person_id: PersonId,
        asset_ids: Vec<AssetId>,
    },
    MergePersons {
        sources: Vec<PersonId>,
        target: PersonId,
    },
    AlbumMembership {
        album_id: AlbumId,
    },
}

impl Mutation {
    pub fn delete_asset(asset_id: AssetId) -> Self {
        Mutation::DeleteAssets {
            asset_ids: vec![asset_id],
        }
    }

    pub fn merge_person(source: PersonId, target: PersonId) -> Self {
        Mutation::MergePersons {
            sources: vec![source],
            target,
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::DeleteAssets { .. } => MutationKind::DeleteAssets,
            Mutation::UnassignFaces { .. } => MutationKind::UnassignFaces,
            Mutation::MergePersons { .. } => MutationKind::MergePersons,
            Mutation::AlbumMembership { .. } => MutationKind::AlbumMembership,
        }
    }
}

/// What one reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries patched in place
    pub patched: Vec<CacheKey>,
    /// Entries marked for refetch
    pub invalidated: Vec<CacheKey>,
    pub items_removed: usize,
    /// Person the active view was redirected to
    pub redirected_to: Option<PersonId>,
    /// Active view that must be refetched now
    pub refetch_now: Option<CacheKey>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.patched.is_empty() && self.invalidated.is_empty() && self.redirected_to.is_none()
    }
}

pub struct Synchronizer {
    cache: Arc<QueryCache>,
    view: RwLock<ActiveView>,
    reconciliations: AtomicU64,
}

impl Synchronizer {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self {
            cache,
            view: RwLock::new(ActiveView::default()),
            reconciliations: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn active_view(&self) -> ActiveView {
        self.view.read().clone()
    }

    pub fn set_active_view(&self, view: ActiveView) {
        *self.view.write() = view;
    }

    /// Number of mutation outcomes reconciled so far
    pub fn reconciliations(&self) -> u64 {
        self.reconciliations.load(Ordering::SeqCst)
    }

    pub fn synchronize_after(&self, mutation: &Mutation) -> SyncReport {
        let mut view = self.view.write();
        let mut report = SyncReport::default();

        self.cache.with_entries_mut(|entries| match mutation {
            Mutation::DeleteAssets { asset_ids } => {
                let ids: HashSet<AssetId> = asset_ids.iter().copied().collect();
                if ids.is_empty() {
                    return;
                }
                for (key, entry) in entries.iter_mut() {
                    let removed = entry.remove_assets(&ids);
                    if removed > 0 {
                        report.items_removed += removed;
                        report.patched.push(key.clone());
                    }
                }
            }
            Mutation::UnassignFaces {
                person_id,
                asset_ids,
            } => {
                let ids: HashSet<AssetId> = asset_ids.iter().copied().collect();
                for (key, entry) in entries.iter_mut() {
                    let scoped_holder =
                        key.person_scope() == Some(*person_id) && entry.contains_any(&ids);
                    let face_aggregate = matches!(
                        key.resource(),
                        Resource::UnassignedFaces | Resource::FaceProgress
                    );
                    if scoped_holder || face_aggregate {
                        entry.invalidate();
                        report.invalidated.push(key.clone());
                    }
                }
            }
            Mutation::MergePersons { sources, target } => {
                for (key, entry) in entries.iter_mut() {
                    let scoped = key
                        .person_scope()
                        .map_or(false, |p| p == *target || sources.contains(&p));
                    if scoped || key.is_person_aggregate() {
                        entry.invalidate();
                        report.invalidated.push(key.clone());
                    }
                }
            }
            Mutation::AlbumMembership { .. } => {}
        });

        if let Mutation::MergePersons { sources, target } = mutation {
            for source in sources.iter().filter(|s| *s != target) {
                if view.redirect_person(*source, *target) {
                    report.redirected_to = Some(*target);
                }
            }
        }

        report.patched.sort();
        report.invalidated.sort();
        if let Some(active) = &view.key {
            if report.redirected_to.is_some() || report.invalidated.contains(active) {
                report.refetch_now = Some(active.clone());
            }
        }
        drop(view);

        self.reconciliations.fetch_add(1, Ordering::SeqCst);
        if report.is_noop() {
            debug!(mutation = %mutation.kind(), "Reconciliation changed nothing");
        } else {
            info!(
                mutation = %mutation.kind(),
                patched = report.patched.len(),
                invalidated = report.invalidated.len(),
                items_removed = report.items_removed,
                redirected_to = ?report.redirected_to,
                "Cache reconciled"
            );
        }
        report
    }
}
