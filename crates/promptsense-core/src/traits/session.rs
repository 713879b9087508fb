// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait: users, conversations and message history.

use async_trait::async_trait;

use crate::error::PromptSenseError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, NewMessage, RecentTurn, StoredMessage, UserPreferences};

/// Relational store behind the pipeline.
///
/// The fusion stage only reads from it (`get_preferences`, `recent_turns`);
/// the write path records each exchange after the response is generated.
#[async_trait]
pub trait SessionStore: PluginAdapter {
    /// Creates the user row if it does not exist yet.
    async fn ensure_user(&self, user_id: &str, name: &str) -> Result<(), PromptSenseError>;

    /// Returns the user's preferences, or defaults when none are stored.
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences, PromptSenseError>;

    /// Overlays `preferences` onto the stored ones and returns the result.
    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, PromptSenseError>;

    /// Returns the last `limit` turns, oldest first. With a conversation id
    /// only that conversation is considered.
    async fn recent_turns(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecentTurn>, PromptSenseError>;

    /// Persists a message and returns its id.
    async fn save_message(&self, message: NewMessage) -> Result<String, PromptSenseError>;

    /// Flags a message whose embedding has been appended to the vector index.
    async fn mark_vector_saved(&self, message_id: &str) -> Result<(), PromptSenseError>;

    /// Returns the user's messages, newest first.
    async fn history(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>, PromptSenseError>;

    /// Returns the user's most frequent domains, most frequent first.
    async fn common_domains(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, PromptSenseError>;

    /// Returns `(intent, count)` pairs for the user's messages, most frequent first.
    async fn intent_counts(&self, user_id: &str) -> Result<Vec<(String, u64)>, PromptSenseError>;

    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation, PromptSenseError>;

    /// Lists the user's conversations, most recently updated first.
    async fn list_conversations(&self, user_id: &str)
        -> Result<Vec<Conversation>, PromptSenseError>;

    /// Returns every message of a conversation, oldest first.
    async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, PromptSenseError>;

    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), PromptSenseError>;

    /// Deletes a conversation and its messages. Returns `false` if it did not exist.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, PromptSenseError>;
}
