//! Gallery Server Collaborators
//!
//! The server is the source of truth for assets, people and faces. The core only
//! talks to it through these traits: paginated queries, face reassignment and person
//! merge, and asset deletion. `http` is the production client; `memory` is a
//! deterministic in-process server used by tests and local sessions.

use crate::cache::{CacheKey, Page};
use crate::error::GalleryError;
use crate::types::{AssetId, Face, FaceId, PersonId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod http;
pub mod memory;

pub use http::HttpGalleryClient;
pub use memory::InMemoryServer;

/// Result of merging one person into another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub faces_moved: u64,
    /// Refreshed face count of the target profile, when the server reports it
    pub target_face_count: Option<u64>,
}

/// Result of deleting one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub success: bool,
    /// Offending path when a permanent delete hit a read-only file
    pub read_only_path: Option<String>,
}

impl DeleteOutcome {
    pub fn deleted() -> Self {
        Self {
            success: true,
            read_only_path: None,
        }
    }
}

/// Paginated asset/person/face queries keyed by filter parameters
#[async_trait]
pub trait AssetQuery: Send + Sync {
    async fn fetch_page(
        &self,
        key: &CacheKey,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Page, GalleryError>;
}

#[async_trait]
pub trait FaceService: Send + Sync {
    async fn faces_for_asset(&self, asset_id: AssetId) -> Result<Vec<Face>, GalleryError>;

    /// Reassign a face. `None` unassigns it.
    async fn assign_face(
        &self,
        face_id: FaceId,
        person_id: Option<PersonId>,
    ) -> Result<(), GalleryError>;

    async fn merge_person(
        &self,
        source: PersonId,
        target: PersonId,
    ) -> Result<MergeOutcome, GalleryError>;
}

#[async_trait]
pub trait AssetDeletion: Send + Sync {
    async fn delete_asset(
        &self,
        asset_id: AssetId,
        permanent: bool,
    ) -> Result<DeleteOutcome, GalleryError>;
}

/// Everything the core needs from the server
pub trait GalleryBackend: AssetQuery + FaceService + AssetDeletion {}

impl<T> GalleryBackend for T where T: AssetQuery + FaceService + AssetDeletion {}
