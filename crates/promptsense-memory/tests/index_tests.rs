// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property and concurrency tests for the vector index.

use std::sync::Arc;

use promptsense_memory::{IndexOptions, NewEntry, VectorIndex, squared_l2};
use proptest::prelude::*;

const DIM: usize = 3;

fn options(dir: &tempfile::TempDir) -> IndexOptions {
    IndexOptions {
        dimension: DIM,
        vector_path: dir.path().join("index.bin"),
        metadata_path: dir.path().join("metadata.json"),
        flush_interval: 1_000,
        overfetch_multiplier: 3,
    }
}

fn new_entry(owner: usize, id: usize, vector: Vec<f32>) -> NewEntry {
    NewEntry {
        vector,
        owner_id: format!("u{owner}"),
        source_id: format!("m{id}"),
        text: format!("text {id}"),
        intent: None,
        domain: None,
    }
}

fn entries() -> impl Strategy<Value = Vec<(usize, Vec<f32>)>> {
    prop::collection::vec(
        (0usize..3, prop::collection::vec(-100.0f32..100.0, DIM)),
        0..40,
    )
}

proptest! {
    #[test]
    fn filtered_search_only_returns_owner(
        items in entries(),
        query in prop::collection::vec(-100.0f32..100.0, DIM),
        k in 0usize..8,
        owner in 0usize..3,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::empty(options(&dir));
        for (i, (o, v)) in items.iter().enumerate() {
            index.append(new_entry(*o, i, v.clone())).unwrap();
        }

        let owner_id = format!("u{owner}");
        let hits = index.search(&query, k, Some(&owner_id)).unwrap();
        prop_assert!(hits.len() <= k);
        prop_assert!(hits.iter().all(|h| h.owner_id == owner_id));
    }

    #[test]
    fn unfiltered_search_is_sorted_and_exact(
        items in entries(),
        query in prop::collection::vec(-100.0f32..100.0, DIM),
        k in 1usize..8,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::empty(options(&dir));
        for (i, (o, v)) in items.iter().enumerate() {
            index.append(new_entry(*o, i, v.clone())).unwrap();
        }

        let hits = index.search(&query, k, None).unwrap();
        prop_assert_eq!(hits.len(), k.min(items.len()));
        prop_assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

        // The best hit matches a brute-force scan.
        if let Some(first) = hits.first() {
            let best = items
                .iter()
                .map(|(_, v)| squared_l2(&query, v))
                .fold(f32::INFINITY, f32::min);
            prop_assert_eq!(first.distance, best);
        }
    }

    #[test]
    fn rebuild_leaves_contiguous_positions(items in entries(), owner in 0usize..3) {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::empty(options(&dir));
        for (i, (o, v)) in items.iter().enumerate() {
            index.append(new_entry(*o, i, v.clone())).unwrap();
        }

        let owner_id = format!("u{owner}");
        let expected_removed = items.iter().filter(|(o, _)| *o == owner).count();
        prop_assert_eq!(index.rebuild_excluding(&owner_id).unwrap(), expected_removed);
        prop_assert_eq!(index.owner_count(&owner_id).unwrap(), 0);

        let mut positions: Vec<usize> = (0..3)
            .flat_map(|o| index.owner_history(&format!("u{o}"), usize::MAX).unwrap())
            .map(|e| e.position)
            .collect();
        positions.sort_unstable();
        let expected: Vec<usize> = (0..items.len() - expected_removed).collect();
        prop_assert_eq!(positions, expected);
    }
}

#[test]
fn concurrent_appends_and_searches_stay_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(VectorIndex::empty(options(&dir)));

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                for i in 0..50 {
                    index
                        .append(new_entry(t, t * 100 + i, vec![i as f32, t as f32, 0.0]))
                        .unwrap();
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..2)
        .map(|_| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let hits = index.search(&[1.0, 1.0, 0.0], 3, Some("u1")).unwrap();
                    assert!(hits.iter().all(|h| h.owner_id == "u1"));
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    let stats = index.stats().unwrap();
    assert_eq!(stats.total_vectors, 200);
    assert_eq!(stats.metadata_count, 200);
}
