// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similar-query retrieval: embed the message, then search the index scoped
//! to the asking user.
//!
//! Retrieval never fails the caller. An embedding failure skips the search and
//! a search failure yields no neighbors; both are logged. The scan runs on the
//! blocking pool since it holds the index read lock.

use std::sync::Arc;

use promptsense_core::PromptSenseError;
use promptsense_core::traits::EmbeddingAdapter;
use promptsense_core::types::EmbeddingInput;
use tracing::{debug, warn};

use crate::index::VectorIndex;
use crate::types::Neighbor;

/// Result of one retrieval.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// The message embedding, kept so the caller can append it later.
    pub embedding: Option<Vec<f32>>,
    pub neighbors: Vec<Neighbor>,
}

/// Embeds messages and finds the nearest prior queries of the same user.
pub struct NeighborRetriever {
    embedder: Arc<dyn EmbeddingAdapter>,
    index: Arc<VectorIndex>,
}

impl NeighborRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingAdapter>, index: Arc<VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Embeds one text and checks it against the index dimension.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, PromptSenseError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;

        let vector = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| PromptSenseError::Embedding {
                message: "embedding returned no vectors".to_string(),
                source: None,
            })?;

        if vector.len() != self.index.dimension() {
            return Err(PromptSenseError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    /// Embeds `text` and returns up to `k` of `owner_id`'s nearest entries.
    pub async fn retrieve(&self, text: &str, owner_id: &str, k: usize) -> Retrieval {
        let embedding = match self.embed(text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "embedding failed, skipping similar-query retrieval");
                metrics::counter!("promptsense_fallbacks_total", "stage" => "embedding")
                    .increment(1);
                return Retrieval::default();
            }
        };

        let index = self.index.clone();
        let query = embedding.clone();
        let owner = owner_id.to_string();
        let searched = tokio::task::spawn_blocking(move || index.search(&query, k, Some(&owner)))
            .await
            .map_err(|e| PromptSenseError::Internal(format!("search task failed: {e}")))
            .and_then(|result| result);

        let neighbors = match searched {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "vector search failed, continuing without neighbors");
                metrics::counter!("promptsense_fallbacks_total", "stage" => "search")
                    .increment(1);
                Vec::new()
            }
        };
        debug!(owner_id, found = neighbors.len(), "retrieved similar queries");

        Retrieval {
            embedding: Some(embedding),
            neighbors,
        }
    }
}
