// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI adapter for PromptSense.
//!
//! One [`OpenAiProvider`] serves both collaborator roles the pipeline needs:
//! [`EmbeddingAdapter`] over `/embeddings` and [`ProviderAdapter`] over
//! `/chat/completions`.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use promptsense_config::model::PromptSenseConfig;
use promptsense_core::error::PromptSenseError;
use promptsense_core::traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
use promptsense_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, ProviderRequest,
    ProviderResponse, TokenUsage,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest, EmbeddingRequest};

/// OpenAI-backed embedding and chat-completion adapter.
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
    chat_model: String,
    embedding_model: String,
    dimension: usize,
}

impl OpenAiProvider {
    /// Creates a provider from the `[openai]` section; the expected embedding
    /// dimension comes from `[index]`.
    pub fn new(config: &PromptSenseConfig) -> Result<Self, PromptSenseError> {
        let api_key = resolve_api_key(&config.openai.api_key)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.openai.base_url,
            Duration::from_secs(config.openai.request_timeout_secs.max(1)),
        )?;

        info!(
            chat_model = config.openai.chat_model,
            embedding_model = config.openai.embedding_model,
            "OpenAI provider initialized"
        );

        Ok(Self::with_client(
            client,
            config.openai.chat_model.clone(),
            config.openai.embedding_model.clone(),
            config.index.dimension,
        ))
    }

    /// Creates a provider with an existing client.
    pub fn with_client(
        client: OpenAiClient,
        chat_model: String,
        embedding_model: String,
        dimension: usize,
    ) -> Self {
        Self {
            client,
            chat_model,
            embedding_model,
            dimension,
        }
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    fn to_chat_request(&self, request: ProviderRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.unwrap_or_else(|| self.chat_model.clone()),
            messages: request
                .messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, PromptSenseError> {
        // No request is made here so health checks do not spend tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PromptSenseError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, PromptSenseError> {
        let api_request = self.to_chat_request(request);
        let response = self.client.chat(&api_request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PromptSenseError::Provider {
                message: "completion returned no choices".into(),
                source: None,
            })?;
        let content = choice
            .message
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PromptSenseError::Provider {
                message: "completion returned empty content".into(),
                source: None,
            })?;
        let usage = response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason: choice.finish_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiProvider {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, PromptSenseError> {
        let expected = input.texts.len();
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: input.texts,
        };
        let response = self.client.embeddings(&request).await.map_err(|e| {
            PromptSenseError::Embedding {
                message: e.to_string(),
                source: Some(Box::new(e)),
            }
        })?;

        let mut data = response.data;
        if data.len() != expected {
            return Err(PromptSenseError::Embedding {
                message: format!("requested {expected} embeddings, received {}", data.len()),
                source: None,
            });
        }
        data.sort_by_key(|d| d.index);

        if let Some(bad) = data.iter().find(|d| d.embedding.len() != self.dimension) {
            return Err(PromptSenseError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.embedding.len(),
            });
        }

        Ok(EmbeddingOutput {
            embeddings: data.into_iter().map(|d| d.embedding).collect(),
            dimensions: self.dimension,
        })
    }
}

/// Resolves the OpenAI API key: config first, then `OPENAI_API_KEY`.
pub fn resolve_api_key(config_key: &Option<String>) -> Result<String, PromptSenseError> {
    if let Some(key) = config_key.as_deref() {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            PromptSenseError::Config(
                "OpenAI API key not found. Set openai.api_key in config or the OPENAI_API_KEY environment variable.".into(),
            )
        })
}
