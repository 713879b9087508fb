// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation title generation.

use tracing::{debug, warn};

use promptsense_core::PromptSenseError;
use promptsense_core::types::{ProviderMessage, ProviderRequest};

use crate::pipeline::PromptPipeline;

const TITLE_PROMPT: &str = "Generate a short, concise title (3-6 words max) for a conversation \
based on the first message. Return ONLY the title, nothing else.";

const TITLE_TEMPERATURE: f32 = 0.7;
const TITLE_MAX_TOKENS: u32 = 20;
const FALLBACK_TITLE_CHARS: usize = 50;

impl PromptPipeline {
    /// Names a conversation after its first user message and stores the title.
    pub async fn generate_title(&self, conversation_id: &str) -> Result<String, PromptSenseError> {
        let messages = self.store().conversation_messages(conversation_id).await?;
        if messages.is_empty() {
            return Err(PromptSenseError::InvalidInput(format!(
                "no messages found in conversation {conversation_id}"
            )));
        }
        let first = messages
            .iter()
            .find(|m| m.role == "user")
            .ok_or_else(|| {
                PromptSenseError::InvalidInput(format!(
                    "no user messages in conversation {conversation_id}"
                ))
            })?;

        let request = ProviderRequest {
            model: None,
            messages: vec![
                ProviderMessage::system(TITLE_PROMPT),
                ProviderMessage::user(first.content.clone()),
            ],
            max_tokens: TITLE_MAX_TOKENS,
            temperature: TITLE_TEMPERATURE,
        };

        let title = match self.provider().complete(request).await {
            Ok(response) => {
                let cleaned = clean_title(&response.content);
                if cleaned.is_empty() {
                    fallback_title(&first.content)
                } else {
                    cleaned
                }
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "title generation failed, using message prefix");
                fallback_title(&first.content)
            }
        };

        self.store()
            .update_conversation_title(conversation_id, &title)
            .await?;
        debug!(conversation_id, title = title.as_str(), "conversation titled");
        Ok(title)
    }
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn fallback_title(message: &str) -> String {
    let mut title: String = message.chars().take(FALLBACK_TITLE_CHARS).collect();
    if message.chars().count() > FALLBACK_TITLE_CHARS {
        title.push_str("...");
    }
    title
}
