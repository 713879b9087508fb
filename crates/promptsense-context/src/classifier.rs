// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent and domain classification through the chat model.
//!
//! Each label is one short completion. Replies are trimmed and lowercased,
//! then parsed; anything that fails or does not parse becomes the default
//! label (`conversation` / `general`).

use std::str::FromStr;
use std::sync::Arc;

use promptsense_core::PromptSenseError;
use promptsense_core::traits::ProviderAdapter;
use promptsense_core::types::{Domain, Intent, ProviderMessage, ProviderRequest};
use tracing::{debug, warn};

const INTENT_PROMPT: &str = "Analyze the user message and classify the intent into ONE of these categories:
- learning: User wants to learn or understand something
- problem_solving: User needs help solving a specific problem
- creative: User wants to create, write, or generate something
- analysis: User wants analysis or insights on data/topic
- conversation: General conversation or chitchat
- clarification: User is asking for clarification

Respond with ONLY the category name, nothing else.";

const DOMAIN_PROMPT: &str = "Analyze the user message and classify it into ONE primary domain:
- technology: Programming, software, hardware, IT
- science: Physics, chemistry, biology, research
- business: Finance, marketing, management, entrepreneurship
- creative: Writing, art, design, music
- education: Learning, teaching, academic topics
- health: Medical, fitness, wellness
- travel: Tourism, geography, culture
- general: Everyday topics, chitchat

Respond with ONLY the domain name, nothing else.";

const CLASSIFY_TEMPERATURE: f32 = 0.3;
const CLASSIFY_MAX_TOKENS: u32 = 20;

/// Both labels for one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub domain: Domain,
}

/// Labels messages with an [`Intent`] and a [`Domain`].
pub struct LlmClassifier {
    provider: Arc<dyn ProviderAdapter>,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn ProviderAdapter>) -> Self {
        Self { provider }
    }

    /// Runs both classifications concurrently.
    pub async fn classify(&self, text: &str) -> Classification {
        let (intent, domain) = tokio::join!(self.intent(text), self.domain(text));
        Classification { intent, domain }
    }

    pub async fn intent(&self, text: &str) -> Intent {
        self.label(INTENT_PROMPT, text, "intent").await
    }

    pub async fn domain(&self, text: &str) -> Domain {
        self.label(DOMAIN_PROMPT, text, "domain").await
    }

    async fn label<L>(&self, prompt: &str, text: &str, kind: &'static str) -> L
    where
        L: FromStr + Default + std::fmt::Display,
    {
        match self.try_label(prompt, text).await {
            Ok(label) => {
                debug!(kind, %label, "classified message");
                label
            }
            Err(e) => {
                let fallback = L::default();
                warn!(kind, error = %e, %fallback, "classification failed, using default label");
                metrics::counter!("promptsense_fallbacks_total", "stage" => kind).increment(1);
                fallback
            }
        }
    }

    async fn try_label<L: FromStr>(&self, prompt: &str, text: &str) -> Result<L, PromptSenseError> {
        let response = self
            .provider
            .complete(ProviderRequest {
                model: None,
                messages: vec![ProviderMessage::system(prompt), ProviderMessage::user(text)],
                max_tokens: CLASSIFY_MAX_TOKENS,
                temperature: CLASSIFY_TEMPERATURE,
            })
            .await?;

        let reply = response.content.trim().to_lowercase();
        L::from_str(&reply).map_err(|_| PromptSenseError::Classification {
            message: format!("unrecognized label `{reply}`"),
        })
    }
}
