//! Integration tests for the Dependent Pagination Loader

use gallery_sync::album::{AlbumStore, MemoryRecordBackend};
use gallery_sync::cache::{CacheKey, QueryCache};
use gallery_sync::loader::{DependentLoader, Resolution};
use gallery_sync::service::InMemoryServer;
use gallery_sync::{Gallery, GalleryOptions};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn ids(values: &[i64]) -> HashSet<i64> {
    values.iter().copied().collect()
}

#[tokio::test]
async fn test_terminates_within_page_count() {
    // 20 assets, 4 per page: P = 5 pages
    let server = Arc::new(InMemoryServer::with_assets(20));
    let cache = Arc::new(QueryCache::new());
    let loader = DependentLoader::new(cache.clone(), server.clone(), 4);

    let result = loader
        .ensure_resolved(&CacheKey::gallery(), &ids(&[3, 11, 20]))
        .await;
    assert_eq!(result, Resolution::Resolved { fetched: 5 });
    assert!(server.fetch_count() <= 5);

    let again = loader
        .ensure_resolved(&CacheKey::gallery(), &ids(&[3, 11, 20]))
        .await;
    assert_eq!(again, Resolution::Resolved { fetched: 0 });
    assert_eq!(server.fetch_count(), 5);
}

#[tokio::test]
async fn test_stops_early_once_target_is_loaded() {
    let server = Arc::new(InMemoryServer::with_assets(100));
    let cache = Arc::new(QueryCache::new());
    let loader = DependentLoader::new(cache, server.clone(), 10);

    let result = loader
        .ensure_resolved(&CacheKey::gallery(), &ids(&[1, 15]))
        .await;
    assert_eq!(result, Resolution::Resolved { fetched: 2 });
    assert_eq!(server.fetch_count(), 2);
}

#[tokio::test]
async fn test_empty_target_never_fetches() {
    let server = Arc::new(InMemoryServer::with_assets(5));
    let cache = Arc::new(QueryCache::new());
    let loader = DependentLoader::new(cache.clone(), server.clone(), 2);

    let result = loader
        .ensure_resolved(&CacheKey::gallery(), &HashSet::new())
        .await;
    assert_eq!(result, Resolution::Resolved { fetched: 0 });
    assert_eq!(server.fetch_count(), 0);
    assert!(cache.snapshot(&CacheKey::gallery()).is_none());
}

#[tokio::test]
async fn test_second_observer_does_not_fetch_while_one_is_outstanding() {
    let server = Arc::new(InMemoryServer::with_assets(6));
    server.hold_fetches();
    let cache = Arc::new(QueryCache::new());
    let loader = DependentLoader::new(cache.clone(), server.clone(), 10);
    let key = CacheKey::gallery();
    let target = ids(&[2, 5]);

    let (first, second, third, _) = tokio::join!(
        loader.ensure_resolved(&key, &target),
        loader.ensure_resolved(&key, &target),
        loader.ensure_resolved(&key, &target),
        async {
            tokio::task::yield_now().await;
            server.release_fetches(1);
        }
    );

    assert_eq!(first, Resolution::Resolved { fetched: 1 });
    assert!(matches!(second, Resolution::Pending { .. }));
    assert!(matches!(third, Resolution::Pending { .. }));
    assert_eq!(second.missing(), &[2, 5]);
    assert_eq!(server.fetch_count(), 1);
}

#[tokio::test]
async fn test_abandoned_fetch_releases_slot() {
    let server = Arc::new(InMemoryServer::with_assets(3));
    server.hold_fetches();
    let cache = Arc::new(QueryCache::new());
    let loader = DependentLoader::new(cache.clone(), server.clone(), 10);
    let key = CacheKey::gallery();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        loader.ensure_resolved(&key, &ids(&[1])),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(!cache.snapshot(&key).unwrap().is_fetching());

    server.release_fetches(1);
    let result = loader.ensure_resolved(&key, &ids(&[1])).await;
    assert_eq!(result, Resolution::Resolved { fetched: 1 });
}

#[tokio::test]
async fn test_album_resolution_reports_broken_references() {
    let server = Arc::new(InMemoryServer::with_assets(7));
    let albums = AlbumStore::new(Arc::new(MemoryRecordBackend::new()));
    let g = Gallery::new(
        albums,
        server.clone(),
        GalleryOptions {
            page_size: 3,
            ..GalleryOptions::default()
        },
    );
    let album = g.create_album("Archive", None).unwrap();
    g.add_to_album(&album.id, &[7, 404, 2]);

    let resolution = g.ensure_album_resolved(&album.id).await.unwrap();
    assert_eq!(
        resolution,
        Resolution::Partial {
            missing: vec![404],
            fetched: 3
        }
    );

    let view = g.album_view(&album.id).unwrap();
    let resolved: Vec<i64> = view.assets.iter().map(|a| a.id).collect();
    assert_eq!(resolved, vec![2, 7]);
    assert_eq!(view.broken, vec![404]);

    let empty = g.create_album("Empty", None).unwrap();
    let before = server.fetch_count();
    assert_eq!(
        g.ensure_album_resolved(&empty.id).await,
        Some(Resolution::Resolved { fetched: 0 })
    );
    assert_eq!(server.fetch_count(), before);
}
