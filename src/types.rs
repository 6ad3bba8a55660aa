//! Core gallery types shared across the crate.
//!
//! Assets, people and faces are owned by the server; the client only ever holds
//! read-only copies of them inside cache pages.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Server-assigned asset identifier
pub type AssetId = i64;

/// Server-assigned person identifier
pub type PersonId = i64;

/// Server-assigned face identifier
pub type FaceId = i64;

/// Client-generated album identifier
pub type AlbumId = String;

/// A server-managed media item (photo or video)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Content fingerprint
    pub hash: String,
    pub filename: String,
    pub media_type: String,
    /// Modification time, epoch milliseconds
    pub mtime: i64,
}

impl Asset {
    /// Build an asset with placeholder metadata derived from the id.
    pub fn with_id(id: AssetId) -> Self {
        Self {
            id,
            hash: format!("{:016x}", id),
            filename: format!("IMG_{:05}.jpg", id),
            media_type: "image/jpeg".to_string(),
            mtime: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: Option<String>,
    pub face_count: u64,
}

/// A detected face. `person_id == None` is the unassigned state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub id: FaceId,
    pub asset_id: AssetId,
    pub person_id: Option<PersonId>,
}

/// Current wall clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
