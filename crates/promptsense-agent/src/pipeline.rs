// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline: the per-request flow that turns a raw user message into
//! a personalized prompt, a model response and stored history.
//!
//! Every collaborator except response generation degrades to a neutral value
//! on failure. Generation failures produce an unsuccessful [`ChatOutcome`]
//! and nothing is saved.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use promptsense_config::PromptSenseConfig;
use promptsense_context::{FusionContext, FusionEngine, LlmClassifier, QueryRefiner};
use promptsense_core::PromptSenseError;
use promptsense_core::traits::{EmbeddingAdapter, ProviderAdapter, SessionStore};
use promptsense_core::types::{Domain, Intent, NewMessage, ProviderRequest};
use promptsense_memory::{NeighborRetriever, NewEntry, VectorIndex};

/// Reply text used when response generation fails.
pub const GENERIC_FAILURE: &str =
    "I encountered an error processing your request. Please try again.";

/// Result of one pass through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub success: bool,
    pub response: String,
    /// Error detail when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub intent: Intent,
    pub domain: Domain,
    pub similar_queries: usize,
    /// Whether any prior turns were included in the prompt.
    pub context_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_message_id: Option<String>,
    pub enhanced_prompt: String,
}

/// Request-level knobs taken from configuration.
#[derive(Debug, Clone, Copy)]
struct PipelineSettings {
    similar_queries_limit: usize,
    recent_turns_limit: usize,
    max_tokens: u32,
    temperature: f32,
}

/// Coordinates classification, retrieval, fusion, generation and persistence.
pub struct PromptPipeline {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn ProviderAdapter>,
    retriever: NeighborRetriever,
    classifier: LlmClassifier,
    refiner: Option<QueryRefiner>,
    fusion: FusionEngine,
    settings: PipelineSettings,
}

impl PromptPipeline {
    pub fn new(
        config: &PromptSenseConfig,
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn ProviderAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        index: Arc<VectorIndex>,
    ) -> Self {
        let refiner = config
            .refiner
            .enabled
            .then(|| QueryRefiner::new(provider.clone(), &config.refiner));

        info!(
            dimension = index.dimension(),
            refiner = refiner.is_some(),
            "prompt pipeline initialized"
        );

        Self {
            store,
            classifier: LlmClassifier::new(provider.clone()),
            provider,
            retriever: NeighborRetriever::new(embedder, index),
            refiner,
            fusion: FusionEngine::new(),
            settings: PipelineSettings {
                similar_queries_limit: config.retrieval.similar_queries_limit,
                recent_turns_limit: config.retrieval.recent_turns_limit,
                max_tokens: config.openai.max_tokens,
                temperature: config.openai.temperature,
            },
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn ProviderAdapter> {
        &self.provider
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        self.retriever.index()
    }

    /// Runs one user message through the full pipeline.
    ///
    /// Only blank input is rejected with an error. Every other failure is
    /// reported inside the returned [`ChatOutcome`] or absorbed.
    pub async fn process_message(
        &self,
        user_id: &str,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatOutcome, PromptSenseError> {
        if message.trim().is_empty() {
            return Err(PromptSenseError::InvalidInput(
                "message cannot be empty".to_string(),
            ));
        }

        let preferences = match self.store.get_preferences(user_id).await {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!(user_id, error = %e, "failed to load preferences, using defaults");
                Default::default()
            }
        };

        let classification = self.classifier.classify(message).await;

        let recent_turns = match self
            .store
            .recent_turns(user_id, conversation_id, self.settings.recent_turns_limit)
            .await
        {
            Ok(turns) => turns,
            Err(e) => {
                warn!(user_id, error = %e, "failed to load recent turns");
                Vec::new()
            }
        };

        let retrieval = self
            .retriever
            .retrieve(message, user_id, self.settings.similar_queries_limit)
            .await;

        let refined = match &self.refiner {
            Some(refiner) => {
                refiner
                    .refine(message, classification.intent, classification.domain)
                    .await
            }
            None => None,
        };

        let ctx = FusionContext {
            message: message.to_string(),
            refined,
            intent: classification.intent,
            domain: classification.domain,
            preferences,
            recent_turns,
            neighbors: retrieval.neighbors,
        };
        let fused = self.fusion.merge(&ctx);
        debug!(
            user_id,
            intent = %ctx.intent,
            domain = %ctx.domain,
            turns = fused.turns.len(),
            neighbors = ctx.neighbors.len(),
            "prompt fused"
        );

        let mut outcome = ChatOutcome {
            success: false,
            response: String::new(),
            error: None,
            intent: ctx.intent,
            domain: ctx.domain,
            similar_queries: ctx.neighbors.len(),
            context_used: !ctx.recent_turns.is_empty(),
            refined_query: ctx.refined.clone(),
            user_message_id: None,
            assistant_message_id: None,
            enhanced_prompt: fused.annotated,
        };

        let request = ProviderRequest {
            model: None,
            messages: fused.turns,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(user_id, error = %e, "response generation failed");
                outcome.response = GENERIC_FAILURE.to_string();
                outcome.error = Some(e.to_string());
                return Ok(outcome);
            }
        };
        outcome.success = true;
        outcome.response = response.content;

        let intent_label = ctx.intent.to_string();
        let domain_label = ctx.domain.to_string();

        outcome.user_message_id = self
            .save(NewMessage {
                user_id: user_id.to_string(),
                conversation_id: conversation_id.map(String::from),
                role: "user".to_string(),
                content: message.to_string(),
                intent: Some(intent_label.clone()),
                domain: Some(domain_label.clone()),
                enhanced_prompt: Some(outcome.enhanced_prompt.clone()),
                metadata: Some(serde_json::json!({
                    "similar_queries_count": outcome.similar_queries,
                })),
            })
            .await;

        outcome.assistant_message_id = self
            .save(NewMessage {
                user_id: user_id.to_string(),
                conversation_id: conversation_id.map(String::from),
                role: "assistant".to_string(),
                content: outcome.response.clone(),
                intent: Some(intent_label.clone()),
                domain: Some(domain_label.clone()),
                enhanced_prompt: None,
                metadata: None,
            })
            .await;

        if let Some(embedding) = retrieval.embedding {
            if let Some(message_id) = &outcome.user_message_id {
                self.index_message(NewEntry {
                    vector: embedding,
                    owner_id: user_id.to_string(),
                    source_id: message_id.clone(),
                    text: message.to_string(),
                    intent: Some(intent_label),
                    domain: Some(domain_label),
                })
                .await;
            }
        }

        Ok(outcome)
    }

    async fn save(&self, message: NewMessage) -> Option<String> {
        let role = message.role.clone();
        match self.store.save_message(message).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(role = role.as_str(), error = %e, "failed to save message");
                None
            }
        }
    }

    /// Appends the user message vector and flags the stored row.
    async fn index_message(&self, entry: NewEntry) {
        let message_id = entry.source_id.clone();
        let index = self.retriever.index().clone();
        let appended = tokio::task::spawn_blocking(move || index.append(entry))
            .await
            .map_err(|e| PromptSenseError::Internal(format!("index task failed: {e}")))
            .and_then(|result| result);

        match appended {
            Ok(position) => {
                debug!(message_id = message_id.as_str(), position, "message indexed");
                if let Err(e) = self.store.mark_vector_saved(&message_id).await {
                    warn!(message_id = message_id.as_str(), error = %e, "failed to mark vector saved");
                }
            }
            Err(e) => {
                warn!(message_id = message_id.as_str(), error = %e, "failed to index message");
            }
        }
    }

    /// Flushes the index to disk and closes the session store.
    pub async fn shutdown(&self) -> Result<(), PromptSenseError> {
        let index = self.retriever.index().clone();
        tokio::task::spawn_blocking(move || index.persist())
            .await
            .map_err(|e| PromptSenseError::Internal(format!("index task failed: {e}")))??;
        self.store.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptsense_memory::IndexOptions;
    use promptsense_test_utils::{InMemorySessionStore, MockEmbedder, MockProvider};

    const DIM: usize = 8;

    struct Parts {
        pipeline: PromptPipeline,
        store: Arc<InMemorySessionStore>,
        provider: Arc<MockProvider>,
        embedder: Arc<MockEmbedder>,
        index: Arc<VectorIndex>,
        _dir: tempfile::TempDir,
    }

    fn parts(refiner: bool) -> Parts {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PromptSenseConfig::default();
        config.refiner.enabled = refiner;
        let index = Arc::new(VectorIndex::empty(IndexOptions {
            dimension: DIM,
            vector_path: dir.path().join("v.bin"),
            metadata_path: dir.path().join("m.json"),
            flush_interval: 10,
            overfetch_multiplier: 3,
        }));
        let store = Arc::new(InMemorySessionStore::new());
        let provider = Arc::new(MockProvider::new());
        let embedder = Arc::new(MockEmbedder::new(DIM));
        let pipeline = PromptPipeline::new(
            &config,
            store.clone(),
            provider.clone(),
            embedder.clone(),
            index.clone(),
        );
        Parts {
            pipeline,
            store,
            provider,
            embedder,
            index,
            _dir: dir,
        }
    }

    /// Queues classifier replies followed by the model answer.
    async fn script(provider: &MockProvider, intent: &str, domain: &str, answer: &str) {
        // Intent and domain are requested concurrently; both orders must parse.
        provider.add_response(intent.to_string()).await;
        provider.add_response(domain.to_string()).await;
        provider.add_response(answer.to_string()).await;
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let p = parts(false);
        let err = p.pipeline.process_message("u1", "   ", None).await.unwrap_err();
        assert!(matches!(err, PromptSenseError::InvalidInput(_)));
        assert!(p.provider.requests().await.is_empty());
    }

    #[tokio::test]
    async fn successful_message_is_saved_and_indexed() {
        let p = parts(false);
        script(&p.provider, "learning", "learning", "Ownership moves values.").await;

        let outcome = p
            .pipeline
            .process_message("u1", "How does ownership work?", None)
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.response, "Ownership moves values.");
        assert_eq!(outcome.similar_queries, 0);
        assert!(!outcome.context_used);

        let stored = p.store.messages().await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, "user");
        assert!(stored[0].vector_saved);
        assert_eq!(
            stored[0].metadata.as_deref(),
            Some(r#"{"similar_queries_count":0}"#)
        );
        assert_eq!(stored[0].enhanced_prompt.as_deref(), Some(outcome.enhanced_prompt.as_str()));
        assert_eq!(stored[1].role, "assistant");
        assert!(!stored[1].vector_saved);

        assert_eq!(p.index.owner_count("u1").unwrap(), 1);
        assert_eq!(
            p.index.owner_history("u1", 10).unwrap()[0].source_id,
            outcome.user_message_id.unwrap()
        );
    }

    #[tokio::test]
    async fn generation_failure_saves_nothing() {
        let p = parts(false);
        script(&p.provider, "analysis", "science", "unused").await;
        p.provider.fail_call(3, "model overloaded").await;

        let outcome = p
            .pipeline
            .process_message("u1", "Compare two datasets", None)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.response, GENERIC_FAILURE);
        assert!(outcome.error.unwrap().contains("model overloaded"));
        assert!(outcome.user_message_id.is_none());
        assert!(p.store.messages().await.is_empty());
        assert!(p.index.is_empty().unwrap());
    }

    #[tokio::test]
    async fn collaborator_failures_degrade() {
        let p = parts(false);
        p.embedder.fail_next("embedding quota").await;
        p.provider.fail_call(1, "classifier down").await;
        p.provider.fail_call(2, "classifier down").await;
        p.provider.add_response("Here is an answer.".into()).await;

        let outcome = p.pipeline.process_message("u1", "hello there", None).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.intent, Intent::Conversation);
        assert_eq!(outcome.domain, Domain::General);
        assert_eq!(outcome.similar_queries, 0);
        // No embedding, so the saved message is not indexed.
        assert_eq!(p.store.messages().await.len(), 2);
        assert!(!p.store.messages().await[0].vector_saved);
        assert!(p.index.is_empty().unwrap());
    }

    #[tokio::test]
    async fn second_message_sees_history_and_neighbors() {
        let p = parts(false);
        script(&p.provider, "creative", "creative", "A poem about rain.").await;
        p.pipeline
            .process_message("u1", "Write a poem about rain", None)
            .await
            .unwrap();

        script(&p.provider, "creative", "creative", "A poem about snow.").await;
        let outcome = p
            .pipeline
            .process_message("u1", "Write a poem about snow", None)
            .await
            .unwrap();

        assert_eq!(outcome.intent, Intent::Creative);
        assert_eq!(outcome.domain, Domain::Creative);
        assert!(outcome.context_used);
        assert_eq!(outcome.similar_queries, 1);
        assert!(outcome.enhanced_prompt.contains("Write a poem about rain"));

        let generation = p.provider.requests().await.pop().unwrap();
        // System turn, two prior turns, then the annotated prompt.
        assert_eq!(generation.messages.len(), 4);
        assert_eq!(generation.messages[1].content, "Write a poem about rain");
        assert_eq!(generation.messages[2].content, "A poem about rain.");
    }

    #[tokio::test]
    async fn neighbors_are_scoped_to_the_user() {
        let p = parts(false);
        script(&p.provider, "learning", "learning", "ok").await;
        p.pipeline.process_message("u1", "What is a monad?", None).await.unwrap();

        script(&p.provider, "learning", "learning", "ok").await;
        let outcome = p
            .pipeline
            .process_message("u2", "What is a monad?", None)
            .await
            .unwrap();
        assert_eq!(outcome.similar_queries, 0);
        assert_eq!(p.index.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn refiner_rewrites_when_enabled() {
        let p = parts(true);
        script(&p.provider, "learning", "learning", "What is the borrow checker?").await;
        p.provider
            .add_response("The borrow checker enforces ownership rules.".into())
            .await;

        let outcome = p
            .pipeline
            .process_message("u1", "wat is borow cheker", None)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.response, "The borrow checker enforces ownership rules.");
        assert_eq!(
            outcome.refined_query.as_deref(),
            Some("What is the borrow checker?")
        );

        let query_block =
            "\nOriginal Query: wat is borow cheker\nRefined Query: What is the borrow checker?";
        assert!(outcome.enhanced_prompt.ends_with(query_block));
        assert!(!outcome.enhanced_prompt.contains("User Query:"));

        let mut requests = p.provider.requests().await;
        assert_eq!(requests.len(), 4);
        let generation = requests.pop().unwrap();
        let last_turn = generation.messages.last().unwrap();
        assert_eq!(last_turn.role, "user");
        assert!(last_turn.content.ends_with(query_block));
    }

    #[tokio::test]
    async fn refiner_empty_reply_falls_back() {
        let p = parts(true);
        // The refiner call comes after classification and before generation.
        script(&p.provider, "learning", "learning", "").await;
        p.provider.add_response("unused".into()).await;

        let outcome = p
            .pipeline
            .process_message("u1", "wat is borow cheker", None)
            .await
            .unwrap();
        // Third reply is empty, so refinement falls back to the original.
        assert!(outcome.refined_query.is_none());
        assert!(outcome.success);
        assert_eq!(outcome.response, "unused");
        assert_eq!(p.provider.requests().await.len(), 4);
    }

    #[tokio::test]
    async fn storage_failure_does_not_fail_the_outcome() {
        let p = parts(false);
        p.store.fail_writes(true).await;
        script(&p.provider, "learning", "learning", "still answered").await;

        let outcome = p.pipeline.process_message("u1", "hi", None).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.user_message_id.is_none());
        assert!(p.index.is_empty().unwrap());
        assert_eq!(p.embedder.calls(), 1);
    }
}
