// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk snapshot of the vector index: a binary vector blob plus a JSON
//! metadata manifest.
//!
//! Blob layout (all little-endian):
//!
//! ```text
//! magic  [u8; 8]  "PSVIDX01"
//! dim    u32
//! count  u64
//! data   [f32; dim * count]
//! ```
//!
//! Both files are written to a `.tmp` sibling, fsynced, then renamed into
//! place. The two are only meaningful together: any disagreement between them
//! makes the pair unreadable.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use promptsense_core::PromptSenseError;

use crate::types::{EntryMetadata, blob_to_vec, vec_to_blob};

const MAGIC: [u8; 8] = *b"PSVIDX01";
const HEADER_LEN: usize = MAGIC.len() + 4 + 8;

/// Vectors (flattened, row-major) and their metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub vectors: Vec<f32>,
    pub entries: Vec<EntryMetadata>,
}

/// Outcome of reading a snapshot pair.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Neither artifact exists.
    Missing,
    /// Only one of the two artifacts exists.
    Incomplete { present: PathBuf },
    /// Both exist but could not be used.
    Corrupt { reason: String },
    Loaded(Snapshot),
}

/// Writes both artifacts.
pub fn save(
    vector_path: &Path,
    metadata_path: &Path,
    dimension: usize,
    snapshot: &Snapshot,
) -> Result<(), PromptSenseError> {
    let dim = u32::try_from(dimension).map_err(|_| PromptSenseError::Persistence {
        message: format!("dimension {dimension} does not fit the blob header"),
        source: None,
    })?;

    let mut blob = Vec::with_capacity(HEADER_LEN + snapshot.vectors.len() * 4);
    blob.extend_from_slice(&MAGIC);
    blob.extend_from_slice(&dim.to_le_bytes());
    blob.extend_from_slice(&(snapshot.entries.len() as u64).to_le_bytes());
    blob.extend_from_slice(&vec_to_blob(&snapshot.vectors));

    let manifest = serde_json::to_vec_pretty(&snapshot.entries)
        .map_err(|e| PromptSenseError::persistence("failed to serialize index metadata", e))?;

    // Stage both before replacing either, so a failed write leaves the old pair intact.
    let vector_tmp = write_tmp(vector_path, &blob)?;
    let metadata_tmp = match write_tmp(metadata_path, &manifest) {
        Ok(tmp) => tmp,
        Err(e) => {
            let _ = fs::remove_file(&vector_tmp);
            return Err(e);
        }
    };

    // The manifest goes first: if the blob rename then fails, the old blob stays
    // in place and its count or positions no longer match, which `load` reports
    // as corrupt instead of trusting a mixed pair.
    fs::rename(&metadata_tmp, metadata_path).map_err(|e| {
        let _ = fs::remove_file(&vector_tmp);
        let _ = fs::remove_file(&metadata_tmp);
        PromptSenseError::persistence(
            format!("failed to move metadata into {}", metadata_path.display()),
            e,
        )
    })?;
    fs::rename(&vector_tmp, vector_path).map_err(|e| {
        let _ = fs::remove_file(&vector_tmp);
        PromptSenseError::persistence(
            format!("failed to move vector blob into {}", vector_path.display()),
            e,
        )
    })?;
    Ok(())
}

fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf, PromptSenseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                PromptSenseError::persistence(
                    format!("failed to create directory {}", parent.display()),
                    e,
                )
            })?;
        }
    }

    let mut tmp = path.to_path_buf().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let write = |file: &mut File| -> std::io::Result<()> {
        file.write_all(bytes)?;
        file.sync_all()
    };
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .and_then(|mut file| write(&mut file))
        .map_err(|e| {
            PromptSenseError::persistence(format!("failed to write {}", tmp.display()), e)
        })?;
    Ok(tmp)
}

/// Reads both artifacts and checks them against each other and `dimension`.
pub fn load(vector_path: &Path, metadata_path: &Path, dimension: usize) -> LoadOutcome {
    match (vector_path.exists(), metadata_path.exists()) {
        (false, false) => return LoadOutcome::Missing,
        (true, false) => {
            return LoadOutcome::Incomplete {
                present: vector_path.to_path_buf(),
            };
        }
        (false, true) => {
            return LoadOutcome::Incomplete {
                present: metadata_path.to_path_buf(),
            };
        }
        (true, true) => {}
    }

    match read_pair(vector_path, metadata_path, dimension) {
        Ok(snapshot) => LoadOutcome::Loaded(snapshot),
        Err(reason) => LoadOutcome::Corrupt { reason },
    }
}

fn read_pair(vector_path: &Path, metadata_path: &Path, dimension: usize) -> Result<Snapshot, String> {
    let blob = fs::read(vector_path).map_err(|e| format!("read {}: {e}", vector_path.display()))?;
    let manifest =
        fs::read(metadata_path).map_err(|e| format!("read {}: {e}", metadata_path.display()))?;

    if blob.len() < HEADER_LEN || blob[..MAGIC.len()] != MAGIC {
        return Err("vector blob has no valid header".to_string());
    }
    let dim = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&blob[12..HEADER_LEN]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    if dim != dimension {
        return Err(format!(
            "stored dimension {dim} differs from configured dimension {dimension}"
        ));
    }
    let expected_len = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_LEN));
    if expected_len != Some(blob.len()) {
        return Err(format!(
            "vector blob is {} bytes, header promises {count} vectors of dimension {dim}",
            blob.len()
        ));
    }

    let entries: Vec<EntryMetadata> =
        serde_json::from_slice(&manifest).map_err(|e| format!("metadata manifest: {e}"))?;
    if entries.len() != count {
        return Err(format!(
            "metadata has {} entries but blob has {count} vectors",
            entries.len()
        ));
    }
    if let Some(bad) = entries.iter().enumerate().find(|(i, e)| e.position != *i) {
        return Err(format!(
            "metadata entry {} records position {}",
            bad.0, bad.1.position
        ));
    }

    Ok(Snapshot {
        vectors: blob_to_vec(&blob[HEADER_LEN..]),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pos: usize) -> EntryMetadata {
        EntryMetadata {
            owner_id: "u1".into(),
            source_id: format!("m{pos}"),
            text: format!("text {pos}"),
            intent: Some("learning".into()),
            domain: None,
            position: pos,
        }
    }

    fn paths(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        (dir.path().join("idx.bin"), dir.path().join("idx.json"))
    }

    #[test]
    fn save_then_load_returns_same_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (vp, mp) = paths(&dir);
        let snap = Snapshot {
            vectors: vec![1.0, 2.0, 3.0, 4.0],
            entries: vec![entry(0), entry(1)],
        };
        save(&vp, &mp, 2, &snap).unwrap();

        match load(&vp, &mp, 2) {
            LoadOutcome::Loaded(loaded) => assert_eq!(loaded, snap),
            other => panic!("expected loaded snapshot, got {other:?}"),
        }
        assert!(!dir.path().join("idx.bin.tmp").exists());
    }

    #[test]
    fn failed_blob_rename_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let (vectors, metadata) = paths(&dir);
        // A directory at the blob path makes the final rename fail.
        fs::create_dir(&vectors).unwrap();

        let snapshot = Snapshot {
            vectors: vec![1.0, 2.0],
            entries: vec![entry(0)],
        };
        let err = save(&vectors, &metadata, 2, &snapshot).unwrap_err();
        assert!(matches!(err, PromptSenseError::Persistence { .. }));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "orphaned temp files: {leftovers:?}");
        assert!(vectors.is_dir());
    }

    #[test]
    fn missing_and_incomplete_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let (vp, mp) = paths(&dir);
        assert!(matches!(load(&vp, &mp, 2), LoadOutcome::Missing));

        fs::write(&mp, "[]").unwrap();
        assert!(matches!(load(&vp, &mp, 2), LoadOutcome::Incomplete { .. }));
    }

    #[test]
    fn dimension_change_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let (vp, mp) = paths(&dir);
        let snap = Snapshot {
            vectors: vec![1.0, 2.0],
            entries: vec![entry(0)],
        };
        save(&vp, &mp, 2, &snap).unwrap();
        assert!(matches!(load(&vp, &mp, 3), LoadOutcome::Corrupt { .. }));
    }

    #[test]
    fn truncated_blob_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let (vp, mp) = paths(&dir);
        let snap = Snapshot {
            vectors: vec![1.0, 2.0],
            entries: vec![entry(0)],
        };
        save(&vp, &mp, 2, &snap).unwrap();

        let bytes = fs::read(&vp).unwrap();
        fs::write(&vp, &bytes[..bytes.len() - 2]).unwrap();
        assert!(matches!(load(&vp, &mp, 2), LoadOutcome::Corrupt { .. }));
    }

    #[test]
    fn count_disagreement_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let (vp, mp) = paths(&dir);
        let snap = Snapshot {
            vectors: vec![1.0, 2.0],
            entries: vec![entry(0)],
        };
        save(&vp, &mp, 2, &snap).unwrap();
        fs::write(&mp, "[]").unwrap();
        assert!(matches!(load(&vp, &mp, 2), LoadOutcome::Corrupt { .. }));
    }
}
