// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query refinement: asks the chat model to clean up the raw message before
//! it is fused into the prompt.
//!
//! Refinement is best effort. Any failure, timeout, empty reply or runaway
//! rewrite falls back to the original message.

use std::sync::Arc;
use std::time::Duration;

use promptsense_config::model::RefinerConfig;
use promptsense_core::PromptSenseError;
use promptsense_core::traits::ProviderAdapter;
use promptsense_core::types::{Domain, Intent, ProviderMessage, ProviderRequest};
use tracing::{debug, warn};

const REFINE_PROMPT: &str = "You rewrite user questions so they are easier to answer. \
Fix spelling and grammar and make the phrasing precise. Keep the meaning, language and scope \
of the original. Do not answer the question and do not add new requirements. \
Respond with ONLY the rewritten question.";

const REFINE_TEMPERATURE: f32 = 0.3;
const REFINE_MAX_TOKENS: u32 = 200;

/// Rewrites user messages through the chat model.
pub struct QueryRefiner {
    provider: Arc<dyn ProviderAdapter>,
    timeout: Duration,
    max_growth_ratio: f64,
}

impl QueryRefiner {
    pub fn new(provider: Arc<dyn ProviderAdapter>, config: &RefinerConfig) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            max_growth_ratio: config.max_growth_ratio,
        }
    }

    /// Returns the refined query, or `None` when the original should be used.
    pub async fn refine(&self, message: &str, intent: Intent, domain: Domain) -> Option<String> {
        match self.try_refine(message, intent, domain).await {
            Ok(refined) => {
                debug!(original_len = message.len(), refined_len = refined.len(), "query refined");
                Some(refined)
            }
            Err(e) => {
                warn!(error = %e, "query refinement skipped, using original message");
                metrics::counter!("promptsense_fallbacks_total", "stage" => "refinement")
                    .increment(1);
                None
            }
        }
    }

    async fn try_refine(
        &self,
        message: &str,
        intent: Intent,
        domain: Domain,
    ) -> Result<String, PromptSenseError> {
        let request = ProviderRequest {
            model: None,
            messages: vec![
                ProviderMessage::system(REFINE_PROMPT),
                ProviderMessage::user(format!(
                    "Domain: {domain}\nIntent: {intent}\nQuestion: {message}"
                )),
            ],
            max_tokens: REFINE_MAX_TOKENS,
            temperature: REFINE_TEMPERATURE,
        };

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| PromptSenseError::Timeout {
                duration: self.timeout,
            })??;

        let refined = response.content.trim();
        if refined.is_empty() {
            return Err(PromptSenseError::Provider {
                message: "refinement reply was empty".to_string(),
                source: None,
            });
        }

        let limit = message.chars().count() as f64 * self.max_growth_ratio;
        let refined_len = refined.chars().count();
        if refined_len as f64 > limit {
            return Err(PromptSenseError::Provider {
                message: format!(
                    "refinement grew from {} to {refined_len} characters",
                    message.chars().count()
                ),
                source: None,
            });
        }

        Ok(refined.to_string())
    }
}
