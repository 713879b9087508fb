// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full prompt pipeline with mock adapters, a
//! temp SQLite database and an on-disk vector index in the same temp
//! directory. Provides `send_message()` to drive the pipeline in tests.

use std::sync::Arc;

use promptsense_agent::{ChatOutcome, PromptPipeline};
use promptsense_config::PromptSenseConfig;
use promptsense_core::PromptSenseError;
use promptsense_memory::{IndexOptions, VectorIndex};
use promptsense_storage::SqliteSessionStore;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    dimension: usize,
    flush_interval: usize,
    refiner: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            dimension: 8,
            flush_interval: 10,
            refiner: false,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Set the embedding and index dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Persist the index every `n` appends.
    pub fn with_flush_interval(mut self, n: usize) -> Self {
        self.flush_interval = n;
        self
    }

    /// Enable query refinement.
    pub fn with_refiner(mut self) -> Self {
        self.refiner = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, PromptSenseError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| PromptSenseError::Storage { source: e.into() })?;
        let path_str = |name: &str| temp_dir.path().join(name).to_string_lossy().into_owned();

        let mut config = PromptSenseConfig::default();
        config.storage.database_path = path_str("promptsense.db");
        config.index.dimension = self.dimension;
        config.index.vector_path = path_str("promptsense_index.bin");
        config.index.metadata_path = path_str("promptsense_metadata.json");
        config.index.flush_interval = self.flush_interval;
        config.refiner.enabled = self.refiner;

        let store = Arc::new(SqliteSessionStore::open(&config.storage).await?);
        let index = Arc::new(VectorIndex::open(IndexOptions::from(&config.index)));

        let mock_provider = Arc::new(MockProvider::with_responses(self.responses));
        let mock_embedder = Arc::new(MockEmbedder::new(self.dimension));

        let pipeline = Arc::new(PromptPipeline::new(
            &config,
            store.clone(),
            mock_provider.clone(),
            mock_embedder.clone(),
            index.clone(),
        ));

        Ok(TestHarness {
            pipeline,
            mock_provider,
            mock_embedder,
            store,
            index,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The pipeline under test.
    pub pipeline: Arc<PromptPipeline>,
    /// The mock chat provider.
    pub mock_provider: Arc<MockProvider>,
    /// The mock embedding adapter.
    pub mock_embedder: Arc<MockEmbedder>,
    /// SQLite session store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteSessionStore>,
    /// The vector index, persisted inside the temp directory.
    pub index: Arc<VectorIndex>,
    /// Configuration pointing at the temp directory.
    pub config: PromptSenseConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send a message through the full pipeline.
    pub async fn send_message(
        &self,
        user_id: &str,
        text: &str,
    ) -> Result<ChatOutcome, PromptSenseError> {
        self.pipeline.process_message(user_id, text, None).await
    }

    /// Queue the classifier replies and the answer for one message.
    ///
    /// Use a label that is valid as both intent and domain (such as
    /// `creative`) when the test asserts on classification.
    pub async fn script_turn(&self, intent: &str, domain: &str, answer: &str) {
        self.mock_provider.add_response(intent.to_string()).await;
        self.mock_provider.add_response(domain.to_string()).await;
        self.mock_provider.add_response(answer.to_string()).await;
    }

    /// Load a fresh index instance from the artifacts on disk.
    pub fn reopen_index(&self) -> VectorIndex {
        VectorIndex::open(IndexOptions::from(&self.config.index))
    }
}
