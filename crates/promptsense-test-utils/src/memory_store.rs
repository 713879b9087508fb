// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session store for tests that do not need SQLite.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use promptsense_core::PromptSenseError;
use promptsense_core::traits::{PluginAdapter, SessionStore};
use promptsense_core::types::{
    AdapterType, Conversation, HealthStatus, NewMessage, RecentTurn, StoredMessage,
    UserPreferences,
};

#[derive(Default)]
struct State {
    users: HashMap<String, UserPreferences>,
    messages: Vec<StoredMessage>,
    conversations: Vec<Conversation>,
    fail_writes: bool,
}

/// A [`SessionStore`] backed by plain collections.
///
/// Messages keep insertion order, which stands in for creation time.
#[derive(Default)]
pub struct InMemorySessionStore {
    state: Mutex<State>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save_message` call fail.
    pub async fn fail_writes(&self, fail: bool) {
        self.state.lock().await.fail_writes = fail;
    }

    /// All stored messages in insertion order.
    pub async fn messages(&self) -> Vec<StoredMessage> {
        self.state.lock().await.messages.clone()
    }
}

fn now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn ranked(counts: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[async_trait]
impl PluginAdapter for InMemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PromptSenseError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PromptSenseError> {
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn ensure_user(&self, user_id: &str, _name: &str) -> Result<(), PromptSenseError> {
        self.state
            .lock()
            .await
            .users
            .entry(user_id.to_string())
            .or_default();
        Ok(())
    }

    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences, PromptSenseError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, PromptSenseError> {
        let mut state = self.state.lock().await;
        let current = state.users.entry(user_id.to_string()).or_default();
        current.merge(preferences);
        Ok(current.clone())
    }

    async fn recent_turns(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecentTurn>, PromptSenseError> {
        let state = self.state.lock().await;
        let mut turns: Vec<RecentTurn> = state
            .messages
            .iter()
            .rev()
            .filter(|m| m.user_id == user_id)
            .filter(|m| conversation_id.is_none() || m.conversation_id.as_deref() == conversation_id)
            .take(limit)
            .map(|m| RecentTurn {
                role: m.role.clone(),
                content: m.content.clone(),
                intent: m.intent.clone(),
                domain: m.domain.clone(),
            })
            .collect();
        turns.reverse();
        Ok(turns)
    }

    async fn save_message(&self, message: NewMessage) -> Result<String, PromptSenseError> {
        let mut state = self.state.lock().await;
        if state.fail_writes {
            return Err(PromptSenseError::Storage {
                source: "writes disabled".into(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let created_at = now();
        if let Some(conv_id) = &message.conversation_id {
            match state.conversations.iter_mut().find(|c| &c.id == conv_id) {
                Some(conv) => {
                    conv.message_count += 1;
                    conv.updated_at = created_at.clone();
                }
                None => {
                    return Err(PromptSenseError::Storage {
                        source: format!("unknown conversation {conv_id}").into(),
                    });
                }
            }
        }

        state.messages.push(StoredMessage {
            id: id.clone(),
            user_id: message.user_id,
            conversation_id: message.conversation_id,
            role: message.role,
            content: message.content,
            intent: message.intent,
            domain: message.domain,
            enhanced_prompt: message.enhanced_prompt,
            metadata: message.metadata.map(|m| m.to_string()),
            vector_saved: false,
            created_at,
        });
        Ok(id)
    }

    async fn mark_vector_saved(&self, message_id: &str) -> Result<(), PromptSenseError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) {
            message.vector_saved = true;
        }
        Ok(())
    }

    async fn history(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>, PromptSenseError> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .rev()
            .filter(|m| m.user_id == user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn common_domains(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, PromptSenseError> {
        let state = self.state.lock().await;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for domain in state
            .messages
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| m.domain.clone())
        {
            *counts.entry(domain).or_default() += 1;
        }
        Ok(ranked(counts)
            .into_iter()
            .take(limit)
            .map(|(domain, _)| domain)
            .collect())
    }

    async fn intent_counts(&self, user_id: &str) -> Result<Vec<(String, u64)>, PromptSenseError> {
        let state = self.state.lock().await;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for intent in state
            .messages
            .iter()
            .filter(|m| m.user_id == user_id && m.role == "user")
            .filter_map(|m| m.intent.clone())
        {
            *counts.entry(intent).or_default() += 1;
        }
        Ok(ranked(counts))
    }

    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation, PromptSenseError> {
        let created_at = now();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.map(String::from),
            message_count: 0,
            created_at: created_at.clone(),
            updated_at: created_at,
        };
        self.state.lock().await.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, PromptSenseError> {
        let state = self.state.lock().await;
        let mut listed: Vec<Conversation> = state
            .conversations
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps newer conversations first among equal timestamps.
        listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(listed)
    }

    async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, PromptSenseError> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id.as_deref() == Some(conversation_id))
            .cloned()
            .collect())
    }

    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), PromptSenseError> {
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| PromptSenseError::Storage {
                source: "conversation not found".into(),
            })?;
        conversation.title = Some(title.to_string());
        conversation.updated_at = now();
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, PromptSenseError> {
        let mut state = self.state.lock().await;
        let before = state.conversations.len();
        state.conversations.retain(|c| c.id != conversation_id);
        state
            .messages
            .retain(|m| m.conversation_id.as_deref() != Some(conversation_id));
        Ok(state.conversations.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(user: &str, role: &str, content: &str, intent: Option<&str>) -> NewMessage {
        NewMessage {
            user_id: user.into(),
            conversation_id: None,
            role: role.into(),
            content: content.into(),
            intent: intent.map(String::from),
            domain: Some("technology".into()),
            enhanced_prompt: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn recent_turns_are_oldest_first_and_bounded() {
        let store = InMemorySessionStore::new();
        for i in 0..5 {
            store
                .save_message(message("u1", "user", &format!("m{i}"), None))
                .await
                .unwrap();
        }
        store.save_message(message("u2", "user", "other", None)).await.unwrap();

        let turns = store.recent_turns("u1", None, 3).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);

        let history = store.history("u1", 2, 1).await.unwrap();
        assert_eq!(history[0].content, "m3");
        assert_eq!(history[1].content, "m2");
    }

    #[tokio::test]
    async fn intent_counts_only_user_messages() {
        let store = InMemorySessionStore::new();
        store.save_message(message("u1", "user", "a", Some("learning"))).await.unwrap();
        store.save_message(message("u1", "user", "b", Some("learning"))).await.unwrap();
        store.save_message(message("u1", "assistant", "c", Some("creative"))).await.unwrap();

        let counts = store.intent_counts("u1").await.unwrap();
        assert_eq!(counts, vec![("learning".to_string(), 2)]);
        assert_eq!(store.common_domains("u1", 5).await.unwrap(), vec!["technology"]);
    }

    #[tokio::test]
    async fn conversation_lifecycle() {
        let store = InMemorySessionStore::new();
        let conv = store.create_conversation("u1", None).await.unwrap();
        let mut msg = message("u1", "user", "hi", None);
        msg.conversation_id = Some(conv.id.clone());
        store.save_message(msg).await.unwrap();

        let listed = store.list_conversations("u1").await.unwrap();
        assert_eq!(listed[0].message_count, 1);

        store.update_conversation_title(&conv.id, "Greeting").await.unwrap();
        assert!(store.update_conversation_title("nope", "x").await.is_err());

        assert!(store.delete_conversation(&conv.id).await.unwrap());
        assert!(store.conversation_messages(&conv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn preferences_merge() {
        let store = InMemorySessionStore::new();
        let merged = store
            .update_preferences(
                "u1",
                UserPreferences {
                    custom_instructions: Some("Be brief".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(merged.custom_instructions.as_deref(), Some("Be brief"));
        assert_eq!(store.get_preferences("missing").await.unwrap(), UserPreferences::default());
    }
}
