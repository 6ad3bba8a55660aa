//! Integration tests for the Bulk Mutation Coordinator

use gallery_sync::album::{AlbumStore, MemoryRecordBackend};
use gallery_sync::bulk::{BulkAction, BulkCoordinator};
use gallery_sync::cache::{CacheKey, QueryCache};
use gallery_sync::service::InMemoryServer;
use gallery_sync::sync::Synchronizer;
use gallery_sync::{Gallery, GalleryError, GalleryOptions};
use std::sync::Arc;

fn gallery(server: Arc<InMemoryServer>, max_concurrency: usize) -> Gallery {
    let albums = AlbumStore::new(Arc::new(MemoryRecordBackend::new()));
    Gallery::new(
        albums,
        server,
        GalleryOptions {
            page_size: 10,
            max_concurrency,
            prune_deleted_assets: false,
        },
    )
}

#[tokio::test]
async fn test_five_assets_two_succeed_one_fails_two_skip() {
    let server = Arc::new(InMemoryServer::with_assets(5));
    server.add_person(42, Some("Dana"));
    server.add_face(1, Some(42));
    server.add_face(2, Some(42));
    server.add_face(3, Some(42));
    server.add_face(4, Some(13));
    server.fail_asset(3);
    let g = gallery(server.clone(), 3);

    let outcome = g
        .apply_bulk(
            BulkAction::UnassignFromPerson { person_id: 42 },
            &[1, 2, 3, 4, 5],
        )
        .await
        .unwrap();

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.failure_count, 1);
    assert_eq!(outcome.skipped_count, 2);
    assert_eq!(outcome.affected_count, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].id, 3);
    assert_eq!(g.synchronizer().reconciliations(), 1);

    let still_assigned: Vec<i64> = server
        .faces()
        .into_iter()
        .filter(|f| f.person_id == Some(42))
        .map(|f| f.asset_id)
        .collect();
    assert_eq!(still_assigned, vec![3]);
}

#[tokio::test]
async fn test_one_reconciliation_per_bulk_regardless_of_size() {
    let server = Arc::new(InMemoryServer::with_assets(40));
    for id in 1..=40 {
        server.add_face(id, Some(5));
    }
    let g = gallery(server.clone(), 4);
    let ids: Vec<i64> = (1..=40).collect();

    let outcome = g
        .apply_bulk(BulkAction::UnassignFromPerson { person_id: 5 }, &ids)
        .await
        .unwrap();
    assert_eq!(outcome.success_count, 40);
    assert_eq!(g.synchronizer().reconciliations(), 1);
    assert!(server.faces().iter().all(|f| f.person_id.is_none()));
}

#[tokio::test]
async fn test_failures_are_contained_per_item() {
    let server = Arc::new(InMemoryServer::with_assets(6));
    for id in [2, 4, 6] {
        server.fail_asset(id);
    }
    let g = gallery(server.clone(), 2);

    let outcome = g
        .apply_bulk(BulkAction::Delete { permanent: false }, &[1, 2, 3, 4, 5, 6])
        .await
        .unwrap();
    assert_eq!(outcome.success_count, 3);
    assert_eq!(outcome.failure_count, 3);
    assert_eq!(outcome.succeeded_ids, vec![1, 3, 5]);
    assert_eq!(server.asset_ids(), vec![2, 4, 6]);
    assert_eq!(outcome.summary(), "Deleted 3 of 6 assets, 3 failed");
}

#[tokio::test]
async fn test_invalid_action_fails_before_any_item() {
    let server = Arc::new(InMemoryServer::with_assets(3));
    server.add_face(1, Some(1));
    let g = gallery(server.clone(), 2);

    let err = g
        .apply_bulk(BulkAction::MergeInto { target: 0 }, &[1])
        .await
        .unwrap_err();
    assert!(matches!(err, GalleryError::InvalidAction(_)));

    let err = g
        .apply_bulk(
            BulkAction::RemoveFromAlbum {
                album_id: "album-0-deadbeef".to_string(),
            },
            &[1],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GalleryError::InvalidAction(_)));
    assert_eq!(g.synchronizer().reconciliations(), 0);
    assert!(server.has_person(1));
}

#[tokio::test]
async fn test_remove_from_album_skips_non_members() {
    let server = Arc::new(InMemoryServer::with_assets(3));
    let g = gallery(server, 2);
    let album = g.create_album("Keepers", None).unwrap();
    g.add_to_album(&album.id, &[1, 2]);

    let outcome = g
        .apply_bulk(
            BulkAction::RemoveFromAlbum {
                album_id: album.id.clone(),
            },
            &[2, 3],
        )
        .await
        .unwrap();
    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.skipped_count, 1);
    assert_eq!(g.get_album(&album.id).unwrap().asset_ids, vec![1]);
}

#[tokio::test]
async fn test_coordinator_batches_merge_into_one_invalidation_pass() {
    let server = Arc::new(InMemoryServer::with_assets(3));
    server.add_face(1, Some(1));
    server.add_face(2, Some(2));
    server.add_face(3, Some(3));
    let cache = Arc::new(QueryCache::new());
    cache.insert_pages(CacheKey::people(), vec![]);
    let sync = Arc::new(Synchronizer::new(cache.clone()));
    let albums = AlbumStore::new(Arc::new(MemoryRecordBackend::new()));
    let bulk = BulkCoordinator::new(server.clone(), server.clone(), albums, sync.clone());

    let outcome = bulk
        .apply(BulkAction::MergeInto { target: 3 }, &[1, 2])
        .await
        .unwrap();
    assert_eq!(outcome.success_count, 2);
    assert_eq!(sync.reconciliations(), 1);
    assert!(cache.is_stale(&CacheKey::people()));
    assert!(!server.has_person(1));
    assert!(!server.has_person(2));
}
