//! Property-based tests for album membership set semantics

use gallery_sync::album::{AlbumStore, MemoryRecordBackend};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn store() -> AlbumStore {
    AlbumStore::new(Arc::new(MemoryRecordBackend::new()))
}

fn asset_ids() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..200, 0..40)
}

/// Adding the same ids twice yields the same membership as adding them once
#[test]
fn test_add_assets_idempotent_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(asset_ids(), asset_ids()), |(initial, added)| {
            let store = store();
            let album = store.create("Prop", None).unwrap();
            store.add_assets(&album.id, &initial);

            let once = store.add_assets(&album.id, &added).unwrap();
            let twice = store.add_assets(&album.id, &added).unwrap();
            prop_assert_eq!(&once.asset_ids, &twice.asset_ids);

            let unique: HashSet<i64> = twice.asset_ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), twice.asset_ids.len());
            Ok(())
        })
        .unwrap();
}

/// Removing ids then adding them back restores the original membership set
#[test]
fn test_remove_then_add_round_trip_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(asset_ids(), asset_ids()), |(initial, toggled)| {
            let store = store();
            let album = store.create("Prop", None).unwrap();
            let original = store.add_assets(&album.id, &initial).unwrap();

            // Only ids that were members come back; absent ids stay absent
            let members: Vec<i64> = toggled
                .iter()
                .copied()
                .filter(|id| original.contains(*id))
                .collect();
            store.remove_assets(&album.id, &members);
            let restored = store.add_assets(&album.id, &members).unwrap();

            let before: HashSet<i64> = original.asset_ids.iter().copied().collect();
            let after: HashSet<i64> = restored.asset_ids.iter().copied().collect();
            prop_assert_eq!(before, after);
            Ok(())
        })
        .unwrap();
}

/// `updated_at` never moves backwards across mutations
#[test]
fn test_updated_at_monotonic_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(asset_ids(), 1..6), |batches| {
            let store = store();
            let album = store.create("Prop", None).unwrap();
            let mut last = album.updated_at;
            for (i, batch) in batches.iter().enumerate() {
                let updated = if i % 2 == 0 {
                    store.add_assets(&album.id, batch).unwrap()
                } else {
                    store.remove_assets(&album.id, batch).unwrap()
                };
                prop_assert!(updated.updated_at >= last);
                last = updated.updated_at;
            }
            Ok(())
        })
        .unwrap();
}
