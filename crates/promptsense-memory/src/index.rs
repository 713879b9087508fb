// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared vector index with exact brute-force search.
//!
//! All state lives behind one `RwLock`. Search takes the read side; append,
//! persist and rebuild take the write side, so a search never sees a vector
//! without its metadata and a save never races an append. No method awaits
//! while holding the lock.

use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use promptsense_config::model::IndexConfig;
use promptsense_core::PromptSenseError;
use tracing::{debug, info, warn};

use crate::snapshot::{self, LoadOutcome, Snapshot};
use crate::types::{EntryMetadata, IndexStats, Neighbor, NewEntry, squared_l2};

/// Construction parameters for a [`VectorIndex`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub dimension: usize,
    pub vector_path: PathBuf,
    pub metadata_path: PathBuf,
    /// Appends between automatic saves.
    pub flush_interval: usize,
    /// Candidates fetched per requested result before owner filtering.
    pub overfetch_multiplier: usize,
}

impl From<&IndexConfig> for IndexOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            dimension: config.dimension,
            vector_path: PathBuf::from(&config.vector_path),
            metadata_path: PathBuf::from(&config.metadata_path),
            flush_interval: config.flush_interval.max(1),
            overfetch_multiplier: config.overfetch_multiplier.max(1),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct IndexState {
    /// Row-major, `entries.len() * dimension` values.
    vectors: Vec<f32>,
    entries: Vec<EntryMetadata>,
    /// Successful appends since this instance was created.
    appends: u64,
}

impl IndexState {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            vectors: snapshot.vectors,
            entries: snapshot.entries,
            appends: 0,
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            vectors: self.vectors.clone(),
            entries: self.entries.clone(),
        }
    }
}

/// The vector memory index: sole owner of every stored (vector, metadata) pair.
#[derive(Debug)]
pub struct VectorIndex {
    options: IndexOptions,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Creates an empty index that will persist to the configured paths.
    pub fn empty(options: IndexOptions) -> Self {
        Self {
            options,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Restores the index from disk, or starts empty.
    ///
    /// Never fails: a missing, partial or unreadable snapshot yields an empty
    /// index of the configured dimension.
    pub fn open(options: IndexOptions) -> Self {
        let outcome = snapshot::load(
            &options.vector_path,
            &options.metadata_path,
            options.dimension,
        );
        let state = match outcome {
            LoadOutcome::Loaded(snap) => {
                info!(
                    vectors = snap.entries.len(),
                    dimension = options.dimension,
                    "loaded vector index"
                );
                IndexState::from_snapshot(snap)
            }
            LoadOutcome::Missing => {
                info!(dimension = options.dimension, "created new vector index");
                IndexState::default()
            }
            LoadOutcome::Incomplete { present } => {
                warn!(
                    present = %present.display(),
                    "only one index artifact found, starting with an empty index"
                );
                IndexState::default()
            }
            LoadOutcome::Corrupt { reason } => {
                warn!(reason = %reason, "index snapshot unreadable, starting with an empty index");
                IndexState::default()
            }
        };
        Self {
            options,
            state: RwLock::new(state),
        }
    }

    pub fn dimension(&self) -> usize {
        self.options.dimension
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn len(&self) -> Result<usize, PromptSenseError> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, PromptSenseError> {
        Ok(self.len()? == 0)
    }

    /// Appends one entry and returns its position.
    ///
    /// Every `flush_interval`-th successful append saves the index. A failed
    /// save is logged and does not fail the append; the next periodic save
    /// retries with the full in-memory state.
    pub fn append(&self, entry: NewEntry) -> Result<usize, PromptSenseError> {
        self.check_dimension(entry.vector.len())?;

        let mut state = self.write()?;
        let position = state.entries.len();
        state.vectors.extend_from_slice(&entry.vector);
        state.entries.push(EntryMetadata {
            owner_id: entry.owner_id,
            source_id: entry.source_id,
            text: entry.text,
            intent: entry.intent,
            domain: entry.domain,
            position,
        });
        state.appends += 1;
        metrics::counter!("promptsense_index_appends_total").increment(1);
        debug!(position, "appended vector");

        if state.appends % self.options.flush_interval.max(1) as u64 == 0 {
            match self.save_state(&state) {
                Ok(()) => {
                    metrics::counter!("promptsense_index_flushes_total").increment(1);
                    debug!(vectors = state.entries.len(), "periodic index flush");
                }
                Err(e) => {
                    metrics::counter!("promptsense_index_flush_failures_total").increment(1);
                    warn!(error = %e, "periodic index flush failed, keeping in-memory state");
                }
            }
        }

        Ok(position)
    }

    /// Exact k-nearest-neighbor search, optionally restricted to one owner.
    ///
    /// Fetches the `min(k * overfetch_multiplier, len)` nearest entries, then
    /// drops other owners' entries until `k` remain.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        owner_filter: Option<&str>,
    ) -> Result<Vec<Neighbor>, PromptSenseError> {
        self.check_dimension(query.len())?;
        metrics::counter!("promptsense_index_searches_total").increment(1);

        let state = self.read()?;
        let total = state.entries.len();
        if total == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let dim = self.options.dimension;
        let mut scored: Vec<(f32, usize)> = state
            .vectors
            .chunks_exact(dim)
            .enumerate()
            .map(|(pos, v)| (squared_l2(query, v), pos))
            .collect();

        let fetch = k.saturating_mul(self.options.overfetch_multiplier).min(total);
        let by_distance = |a: &(f32, usize), b: &(f32, usize)| {
            a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
        };
        if fetch < scored.len() {
            scored.select_nth_unstable_by(fetch, by_distance);
            scored.truncate(fetch);
        }
        scored.sort_unstable_by(by_distance);

        let results: Vec<Neighbor> = scored
            .into_iter()
            .map(|(distance, pos)| (distance, &state.entries[pos]))
            .filter(|(_, entry)| owner_filter.is_none_or(|owner| entry.owner_id == owner))
            .take(k)
            .map(|(distance, entry)| Neighbor::from_entry(entry, distance))
            .collect();

        debug!(candidates = fetch, results = results.len(), "index search");
        Ok(results)
    }

    /// Saves both artifacts now.
    pub fn persist(&self) -> Result<(), PromptSenseError> {
        let state = self.write()?;
        self.save_state(&state)?;
        info!(vectors = state.entries.len(), "vector index saved");
        Ok(())
    }

    /// Drops every entry owned by `owner_id`, renumbers from zero and saves.
    ///
    /// The rebuilt index is saved before it replaces the live one, so on any
    /// error the previous state stays in place. Returns the number of removed
    /// entries; when nothing matches, nothing is written.
    pub fn rebuild_excluding(&self, owner_id: &str) -> Result<usize, PromptSenseError> {
        let mut state = self.write()?;
        let dim = self.options.dimension;

        let mut rebuilt = IndexState {
            appends: state.appends,
            ..IndexState::default()
        };
        for (entry, vector) in state.entries.iter().zip(state.vectors.chunks_exact(dim)) {
            if entry.owner_id == owner_id {
                continue;
            }
            let position = rebuilt.entries.len();
            rebuilt.vectors.extend_from_slice(vector);
            rebuilt.entries.push(EntryMetadata {
                position,
                ..entry.clone()
            });
        }

        let removed = state.entries.len() - rebuilt.entries.len();
        if removed == 0 {
            info!(owner_id, "no vectors to remove");
            return Ok(0);
        }

        self.save_state(&rebuilt)?;
        *state = rebuilt;
        info!(owner_id, removed, remaining = state.entries.len(), "rebuilt vector index");
        Ok(removed)
    }

    /// The last `limit` entries of one owner, oldest first.
    pub fn owner_history(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<EntryMetadata>, PromptSenseError> {
        let state = self.read()?;
        let owned: Vec<&EntryMetadata> = state
            .entries
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .collect();
        let skip = owned.len().saturating_sub(limit);
        Ok(owned.into_iter().skip(skip).cloned().collect())
    }

    /// Number of entries owned by `owner_id`.
    pub fn owner_count(&self, owner_id: &str) -> Result<usize, PromptSenseError> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .count())
    }

    pub fn stats(&self) -> Result<IndexStats, PromptSenseError> {
        let state = self.read()?;
        Ok(IndexStats {
            total_vectors: state.vectors.len() / self.options.dimension.max(1),
            dimension: self.options.dimension,
            metadata_count: state.entries.len(),
        })
    }

    fn save_state(&self, state: &IndexState) -> Result<(), PromptSenseError> {
        snapshot::save(
            &self.options.vector_path,
            &self.options.metadata_path,
            self.options.dimension,
            &state.to_snapshot(),
        )
    }

    fn check_dimension(&self, actual: usize) -> Result<(), PromptSenseError> {
        if actual != self.options.dimension {
            return Err(PromptSenseError::DimensionMismatch {
                expected: self.options.dimension,
                actual,
            });
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>, PromptSenseError> {
        self.state
            .read()
            .map_err(|_| PromptSenseError::Internal("vector index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>, PromptSenseError> {
        self.state
            .write()
            .map_err(|_| PromptSenseError::Internal("vector index lock poisoned".to_string()))
    }

    /// Holds the exclusive side, as a save in progress would.
    #[cfg(test)]
    pub(crate) fn write_guard(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.write().unwrap()
    }
}
