// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the vector memory index.

use serde::{Deserialize, Serialize};

/// Descriptive metadata stored alongside one vector.
///
/// The `i`-th element of the metadata manifest describes the `i`-th vector
/// in the blob; `position` always equals that index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// User who produced the source text. Partition key for filtered search.
    pub owner_id: String,
    /// Id of the originating message in the session store.
    pub source_id: String,
    pub text: String,
    pub intent: Option<String>,
    pub domain: Option<String>,
    /// Zero-based insertion order.
    pub position: usize,
}

/// An entry to append; the index assigns the position.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub vector: Vec<f32>,
    pub owner_id: String,
    pub source_id: String,
    pub text: String,
    pub intent: Option<String>,
    pub domain: Option<String>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub text: String,
    pub intent: Option<String>,
    pub domain: Option<String>,
    /// Raw squared Euclidean distance. Smaller is closer; not bounded.
    pub distance: f32,
    pub source_id: String,
    pub owner_id: String,
}

impl Neighbor {
    pub(crate) fn from_entry(entry: &EntryMetadata, distance: f32) -> Self {
        Self {
            text: entry.text.clone(),
            intent: entry.intent.clone(),
            domain: entry.domain.clone(),
            distance,
            source_id: entry.source_id.clone(),
            owner_id: entry.owner_id.clone(),
        }
    }
}

/// Counts reported by [`crate::VectorIndex::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub dimension: usize,
    pub metadata_count: usize,
}

/// Convert f32 vector to little-endian bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert little-endian bytes back to an f32 vector. Trailing bytes that do
/// not form a whole f32 are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_roundtrip_preserves_values() {
        let v = vec![0.0, -1.5, 3.25, f32::MIN_POSITIVE];
        assert_eq!(blob_to_vec(&vec_to_blob(&v)), v);
    }

    #[test]
    fn squared_l2_of_identical_vectors_is_zero() {
        let v = [0.3, 0.4, -2.0];
        assert_eq!(squared_l2(&v, &v), 0.0);
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn metadata_allows_null_labels() {
        let json = r#"{"owner_id":"u1","source_id":"m1","text":"hi","intent":null,"domain":null,"position":0}"#;
        let meta: EntryMetadata = serde_json::from_str(json).unwrap();
        assert!(meta.intent.is_none());
        assert_eq!(meta.position, 0);
    }
}
