// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter producing deterministic vectors.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use promptsense_core::PromptSenseError;
use promptsense_core::traits::{EmbeddingAdapter, PluginAdapter};
use promptsense_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

/// An embedding adapter that derives vectors from a hash of the text.
///
/// The same text always maps to the same vector. Individual texts can be
/// pinned to explicit vectors with [`MockEmbedder::set_vector`].
pub struct MockEmbedder {
    dimension: usize,
    pinned: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    failures: Arc<Mutex<Vec<String>>>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            pinned: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return `vector` whenever `text` is embedded.
    pub async fn set_vector(&self, text: &str, vector: Vec<f32>) {
        self.pinned.lock().await.insert(text.to_string(), vector);
    }

    /// Make the next call fail with an embedding error carrying `message`.
    pub async fn fail_next(&self, message: &str) {
        self.failures.lock().await.push(message.to_string());
    }

    /// Number of `embed` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector this embedder produces for `text` when not pinned.
    pub fn hashed_vector(&self, text: &str) -> Vec<f32> {
        // FNV-1a seed, then an LCG stream mapped into [-1, 1).
        let mut state = text.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
        (0..self.dimension)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, PromptSenseError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PromptSenseError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, PromptSenseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.failures.lock().await.pop() {
            return Err(PromptSenseError::Embedding {
                message,
                source: None,
            });
        }

        let pinned = self.pinned.lock().await;
        let embeddings = input
            .texts
            .iter()
            .map(|text| {
                pinned
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| self.hashed_vector(text))
            })
            .collect();

        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimension,
        })
    }
}
