//! Album identifier generation
//!
//! Identifiers are a creation timestamp plus a random suffix. Collisions are not
//! checked; two albums created in the same millisecond would also need to draw the
//! same 32-bit suffix.

use crate::types::{now_millis, AlbumId};

const SUFFIX_LEN: usize = 8;

/// Generate a new album identifier
pub fn generate_album_id() -> AlbumId {
    generate_album_id_at(now_millis())
}

pub fn generate_album_id_at(timestamp_ms: i64) -> AlbumId {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("album-{}-{}", timestamp_ms, &random[..SUFFIX_LEN])
}
