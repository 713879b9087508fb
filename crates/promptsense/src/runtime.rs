// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by the subcommands: opens the session store and the vector
//! index, and assembles the pipeline around the OpenAI adapter.

use std::sync::Arc;

use promptsense_agent::PromptPipeline;
use promptsense_config::PromptSenseConfig;
use promptsense_core::PromptSenseError;
use promptsense_memory::{IndexOptions, VectorIndex};
use promptsense_openai::OpenAiProvider;
use promptsense_storage::SqliteSessionStore;
use tracing::{debug, warn};

pub async fn open_store(config: &PromptSenseConfig) -> Result<Arc<SqliteSessionStore>, PromptSenseError> {
    Ok(Arc::new(SqliteSessionStore::open(&config.storage).await?))
}

/// Loads the index artifacts on a blocking thread.
pub async fn open_index(config: &PromptSenseConfig) -> Result<Arc<VectorIndex>, PromptSenseError> {
    let options = IndexOptions::from(&config.index);
    let index = tokio::task::spawn_blocking(move || VectorIndex::open(options))
        .await
        .map_err(|e| PromptSenseError::Internal(format!("index load task failed: {e}")))?;
    debug!(vectors = index.len()?, "vector index ready");
    Ok(Arc::new(index))
}

/// Builds the full pipeline. Fails without an OpenAI API key.
pub async fn build_pipeline(config: &PromptSenseConfig) -> Result<PromptPipeline, PromptSenseError> {
    let provider = Arc::new(OpenAiProvider::new(config).inspect_err(|e| {
        if matches!(e, PromptSenseError::Config(_)) {
            eprintln!(
                "error: OpenAI API key required. Set openai.api_key in promptsense.toml or the OPENAI_API_KEY env var"
            );
        }
    })?);
    let store = open_store(config).await?;
    let index = open_index(config).await?;

    Ok(PromptPipeline::new(
        config,
        store,
        provider.clone(),
        provider,
        index,
    ))
}

/// Persists the index and closes the store. A failure is logged rather than
/// returned so an answer that was already produced still reaches the user.
/// Returns whether everything was written.
pub async fn close_pipeline(pipeline: &PromptPipeline) -> bool {
    match pipeline.shutdown().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "shutdown did not complete, unsaved index entries may be lost");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptsense_test_utils::TestHarness;

    #[tokio::test]
    async fn close_pipeline_saves_index() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.send_message("u1", "hello").await.unwrap();

        assert!(close_pipeline(&harness.pipeline).await);
        assert_eq!(harness.reopen_index().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn close_pipeline_absorbs_failed_save() {
        let harness = TestHarness::builder().build().await.unwrap();
        let outcome = harness.send_message("u1", "hello").await.unwrap();
        assert!(outcome.success);

        let artifacts_dir = std::path::Path::new(&harness.config.index.vector_path)
            .parent()
            .unwrap()
            .to_path_buf();
        std::fs::remove_dir_all(&artifacts_dir).unwrap();

        assert!(!close_pipeline(&harness.pipeline).await);
    }
}
