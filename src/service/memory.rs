//! In-process gallery server
//!
//! Holds assets, faces and people in memory and paginates by offset cursors. Supports
//! per-asset failure injection, read-only files, a fetch log, and a gate that holds
//! page fetches until released.

use super::{AssetDeletion, AssetQuery, DeleteOutcome, FaceService, MergeOutcome};
use crate::cache::{CacheKey, Page, PageItems, Resource};
use crate::error::GalleryError;
use crate::types::{Asset, AssetId, Face, FaceId, Person, PersonId};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Default)]
struct ServerState {
    assets: Vec<Asset>,
    faces: Vec<Face>,
    people: BTreeMap<PersonId, Option<String>>,
    failing_assets: HashSet<AssetId>,
    read_only: HashMap<AssetId, String>,
    fail_pages: bool,
    next_face_id: FaceId,
    fetch_log: Vec<(CacheKey, Option<String>)>,
}

#[derive(Default)]
pub struct InMemoryServer {
    state: Mutex<ServerState>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl InMemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server holding assets `1..=count` in ascending order
    pub fn with_assets(count: AssetId) -> Self {
        let server = Self::new();
        for id in 1..=count {
            server.add_asset(Asset::with_id(id));
        }
        server
    }

    pub fn add_asset(&self, asset: Asset) {
        self.state.lock().assets.push(asset);
    }

    pub fn add_person(&self, id: PersonId, name: Option<&str>) {
        self.state.lock().people.insert(id, name.map(str::to_string));
    }

    /// Attach a face to an asset, registering the person if needed
    pub fn add_face(&self, asset_id: AssetId, person_id: Option<PersonId>) -> FaceId {
        let mut state = self.state.lock();
        state.next_face_id += 1;
        let id = state.next_face_id;
        if let Some(person) = person_id {
            state.people.entry(person).or_insert(None);
        }
        state.faces.push(Face {
            id,
            asset_id,
            person_id,
        });
        id
    }

    /// Every per-asset call for this asset fails with a transport error
    pub fn fail_asset(&self, asset_id: AssetId) {
        self.state.lock().failing_assets.insert(asset_id);
    }

    pub fn fail_pages(&self, fail: bool) {
        self.state.lock().fail_pages = fail;
    }

    pub fn mark_read_only(&self, asset_id: AssetId, path: &str) {
        self.state.lock().read_only.insert(asset_id, path.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().fetch_log.len()
    }

    pub fn fetch_log(&self) -> Vec<(CacheKey, Option<String>)> {
        self.state.lock().fetch_log.clone()
    }

    pub fn faces(&self) -> Vec<Face> {
        self.state.lock().faces.clone()
    }

    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.state.lock().assets.iter().map(|a| a.id).collect()
    }

    pub fn has_person(&self, id: PersonId) -> bool {
        self.state.lock().people.contains_key(&id)
    }

    /// Hold every subsequent page fetch until `release_fetches` grants it
    pub fn hold_fetches(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_fetches(&self, count: usize) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(count);
        }
    }

    fn check_asset(&self, asset_id: AssetId) -> Result<(), GalleryError> {
        if self.state.lock().failing_assets.contains(&asset_id) {
            return Err(GalleryError::Transport(format!(
                "connection reset while processing asset {}",
                asset_id
            )));
        }
        Ok(())
    }
}

fn paginate<T: Clone>(items: &[T], cursor: Option<&str>, page_size: usize) -> (Vec<T>, Option<String>) {
    let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
    let page_size = page_size.max(1);
    let end = (start + page_size).min(items.len());
    let page = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
    let next = (end < items.len()).then(|| end.to_string());
    (page, next)
}

#[async_trait]
impl AssetQuery for InMemoryServer {
    async fn fetch_page(
        &self,
        key: &CacheKey,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Page, GalleryError> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| GalleryError::Transport(e.to_string()))?
                .forget();
        }

        let mut state = self.state.lock();
        state
            .fetch_log
            .push((key.clone(), cursor.map(str::to_string)));
        if state.fail_pages {
            return Err(GalleryError::Transport("page request timed out".to_string()));
        }

        let page = match key.resource() {
            Resource::Assets => {
                let assets: Vec<Asset> = match key.person_scope() {
                    Some(person) => {
                        let owned: HashSet<AssetId> = state
                            .faces
                            .iter()
                            .filter(|f| f.person_id == Some(person))
                            .map(|f| f.asset_id)
                            .collect();
                        state
                            .assets
                            .iter()
                            .filter(|a| owned.contains(&a.id))
                            .cloned()
                            .collect()
                    }
                    None => state.assets.clone(),
                };
                let (items, next_cursor) = paginate(&assets, cursor, page_size);
                Page::assets(items, next_cursor)
            }
            Resource::People => {
                let people: Vec<Person> = state
                    .people
                    .iter()
                    .map(|(id, name)| Person {
                        id: *id,
                        name: name.clone(),
                        face_count: state
                            .faces
                            .iter()
                            .filter(|f| f.person_id == Some(*id))
                            .count() as u64,
                    })
                    .collect();
                let (items, next_cursor) = paginate(&people, cursor, page_size);
                Page {
                    items: PageItems::People(items),
                    next_cursor,
                }
            }
            Resource::UnassignedFaces => {
                let faces: Vec<Face> = state
                    .faces
                    .iter()
                    .filter(|f| f.person_id.is_none())
                    .cloned()
                    .collect();
                let (items, next_cursor) = paginate(&faces, cursor, page_size);
                Page {
                    items: PageItems::Faces(items),
                    next_cursor,
                }
            }
            Resource::FaceProgress => {
                let assigned = state.faces.iter().filter(|f| f.person_id.is_some()).count();
                Page {
                    items: PageItems::Summary(json!({
                        "assigned": assigned,
                        "total": state.faces.len(),
                    })),
                    next_cursor: None,
                }
            }
            Resource::Named(name) => {
                return Err(GalleryError::Transport(format!("unknown resource {}", name)));
            }
        };
        Ok(page)
    }
}

#[async_trait]
impl FaceService for InMemoryServer {
    async fn faces_for_asset(&self, asset_id: AssetId) -> Result<Vec<Face>, GalleryError> {
        self.check_asset(asset_id)?;
        Ok(self
            .state
            .lock()
            .faces
            .iter()
            .filter(|f| f.asset_id == asset_id)
            .cloned()
            .collect())
    }

    async fn assign_face(
        &self,
        face_id: FaceId,
        person_id: Option<PersonId>,
    ) -> Result<(), GalleryError> {
        let mut state = self.state.lock();
        let face = state
            .faces
            .iter_mut()
            .find(|f| f.id == face_id)
            .ok_or_else(|| GalleryError::NotFound(format!("face {}", face_id)))?;
        face.person_id = person_id;
        Ok(())
    }

    async fn merge_person(
        &self,
        source: PersonId,
        target: PersonId,
    ) -> Result<MergeOutcome, GalleryError> {
        let mut state = self.state.lock();
        if state.people.remove(&source).is_none() {
            return Err(GalleryError::NotFound(format!("person {}", source)));
        }
        state.people.entry(target).or_insert(None);
        let mut moved = 0u64;
        for face in state.faces.iter_mut().filter(|f| f.person_id == Some(source)) {
            face.person_id = Some(target);
            moved += 1;
        }
        let target_face_count = state
            .faces
            .iter()
            .filter(|f| f.person_id == Some(target))
            .count() as u64;
        Ok(MergeOutcome {
            faces_moved: moved,
            target_face_count: Some(target_face_count),
        })
    }
}

#[async_trait]
impl AssetDeletion for InMemoryServer {
    async fn delete_asset(
        &self,
        asset_id: AssetId,
        permanent: bool,
    ) -> Result<DeleteOutcome, GalleryError> {
        self.check_asset(asset_id)?;
        let mut state = self.state.lock();
        if permanent {
            if let Some(path) = state.read_only.get(&asset_id) {
                return Ok(DeleteOutcome {
                    success: false,
                    read_only_path: Some(path.clone()),
                });
            }
        }
        let before = state.assets.len();
        state.assets.retain(|a| a.id != asset_id);
        if state.assets.len() == before {
            return Ok(DeleteOutcome {
                success: false,
                read_only_path: None,
            });
        }
        state.faces.retain(|f| f.asset_id != asset_id);
        Ok(DeleteOutcome::deleted())
    }
}
