//! Integration tests for the Album Store on sled

use gallery_sync::album::{
    Album, AlbumKeys, AlbumPatch, AlbumStore, MemoryRecordBackend, RecordBackend,
    SledRecordBackend, DEFAULT_ALBUMS_KEY, DEFAULT_LEGACY_ALBUMS_KEY,
};
use gallery_sync::GalleryError;
use std::sync::Arc;
use tempfile::TempDir;

fn legacy_record() -> Vec<u8> {
    let albums = vec![Album {
        id: "album-1700000000000-0badcafe".to_string(),
        name: "Old trip".to_string(),
        description: None,
        asset_ids: vec![10, 11],
        created_at: 1_700_000_000_000,
        updated_at: 1_700_000_000_500,
    }];
    serde_json::to_vec(&albums).unwrap()
}

#[test]
fn test_albums_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let album_id = {
        let backend = Arc::new(SledRecordBackend::new(temp_dir.path()).unwrap());
        let store = AlbumStore::new(backend);
        let album = store.create("  Holidays ", Some("Winter")).unwrap();
        store.add_assets(&album.id, &[5, 6, 5]);
        album.id
    };

    let backend = Arc::new(SledRecordBackend::new(temp_dir.path()).unwrap());
    let store = AlbumStore::new(backend);
    let album = store.get(&album_id).unwrap();
    assert_eq!(album.name, "Holidays");
    assert_eq!(album.description.as_deref(), Some("Winter"));
    assert_eq!(album.asset_ids, vec![5, 6]);
}

#[test]
fn test_create_then_get_round_trips() {
    let store = AlbumStore::new(Arc::new(MemoryRecordBackend::new()));
    let album = store.create("Pets", None).unwrap();
    let fetched = store.get(&album.id).unwrap();
    assert_eq!(fetched, album);
    assert_eq!(fetched.created_at, fetched.updated_at);
    assert!(fetched.id.starts_with("album-"));
}

#[test]
fn test_blank_name_is_rejected() {
    let store = AlbumStore::new(Arc::new(MemoryRecordBackend::new()));
    assert!(matches!(
        store.create("   ", None),
        Err(GalleryError::Validation(_))
    ));
    assert!(store.list().is_empty());
}

#[test]
fn test_update_advances_updated_at_and_unknown_is_none() {
    let store = AlbumStore::new(Arc::new(MemoryRecordBackend::new()));
    let album = store.create("Draft", None).unwrap();
    let renamed = store
        .update(&album.id, AlbumPatch::rename("Final"))
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "Final");
    assert!(renamed.updated_at >= album.updated_at);

    assert!(store
        .update("album-0-00000000", AlbumPatch::rename("x"))
        .unwrap()
        .is_none());
    assert!(!store.delete("album-0-00000000"));
    assert!(store.add_assets("album-0-00000000", &[1]).is_none());
}

#[test]
fn test_legacy_record_migrates_once_on_sled() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(SledRecordBackend::new(temp_dir.path()).unwrap());
    backend
        .write(DEFAULT_LEGACY_ALBUMS_KEY, &legacy_record())
        .unwrap();

    let store = AlbumStore::new(backend.clone());
    let first = store.list();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].asset_ids, vec![10, 11]);
    assert!(backend.read(DEFAULT_LEGACY_ALBUMS_KEY).unwrap().is_none());
    assert!(backend.read(DEFAULT_ALBUMS_KEY).unwrap().is_some());

    let second = store.list();
    assert_eq!(second, first);
}

#[test]
fn test_unparsable_legacy_record_reads_empty() {
    let backend = Arc::new(MemoryRecordBackend::new());
    backend.seed(DEFAULT_LEGACY_ALBUMS_KEY, "{not json");
    let store = AlbumStore::new(backend.clone());
    assert!(store.list().is_empty());
    assert!(!backend.contains(DEFAULT_ALBUMS_KEY));
}

#[test]
fn test_custom_keys_isolate_collections() {
    let backend: Arc<MemoryRecordBackend> = Arc::new(MemoryRecordBackend::new());
    let a = AlbumStore::with_keys(
        backend.clone(),
        AlbumKeys {
            current: "profile-a.albums".to_string(),
            legacy: "profile-a.albums.old".to_string(),
        },
    );
    let b = AlbumStore::new(backend);
    a.create("Only in A", None).unwrap();
    assert_eq!(a.list().len(), 1);
    assert!(b.list().is_empty());
}

#[test]
fn test_write_failure_retains_album_in_memory() {
    let backend = Arc::new(MemoryRecordBackend::new());
    let store = AlbumStore::new(backend.clone());
    backend.fail_writes(true);
    let album = store.create("Ephemeral", None).unwrap();
    assert_eq!(store.get(&album.id).unwrap().name, "Ephemeral");
    assert!(store.add_assets(&album.id, &[1, 2]).is_some());

    // Nothing reached the backend, so a second store starts empty
    assert!(AlbumStore::new(backend.clone()).list().is_empty());

    backend.fail_writes(false);
    store.remove_assets(&album.id, &[1]).unwrap();
    let reopened = AlbumStore::new(backend);
    assert_eq!(reopened.get(&album.id).unwrap().asset_ids, vec![2]);
}

#[test]
fn test_albums_containing() {
    let store = AlbumStore::new(Arc::new(MemoryRecordBackend::new()));
    let a = store.create("A", None).unwrap();
    let b = store.create("B", None).unwrap();
    store.add_assets(&a.id, &[1, 2]);
    store.add_assets(&b.id, &[2, 3]);

    let ids: Vec<String> = store
        .albums_containing(2)
        .into_iter()
        .map(|album| album.id)
        .collect();
    assert_eq!(ids, vec![a.id.clone(), b.id.clone()]);
    assert!(store.albums_containing(9).is_empty());
}
