// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SessionStore trait.

use async_trait::async_trait;
use tracing::debug;

use promptsense_config::model::StorageConfig;
use promptsense_core::types::{Conversation, NewMessage, RecentTurn, StoredMessage, UserPreferences};
use promptsense_core::{AdapterType, HealthStatus, PluginAdapter, PromptSenseError, SessionStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed session store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules.
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    /// Opens the database named in the `[storage]` section.
    pub async fn open(config: &StorageConfig) -> Result<Self, PromptSenseError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite session store initialized");
        Ok(Self { db })
    }

    /// Wraps an already opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PromptSenseError> {
        let result = self.db.integrity_check().await?;
        if result == "ok" {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!("integrity check: {result}")))
        }
    }

    async fn shutdown(&self) -> Result<(), PromptSenseError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    // --- Users ---

    async fn ensure_user(&self, user_id: &str, name: &str) -> Result<(), PromptSenseError> {
        queries::users::ensure_user(&self.db, user_id, name).await
    }

    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences, PromptSenseError> {
        queries::users::get_preferences(&self.db, user_id).await
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, PromptSenseError> {
        queries::users::update_preferences(&self.db, user_id, preferences).await
    }

    // --- Messages ---

    async fn recent_turns(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecentTurn>, PromptSenseError> {
        queries::messages::recent_turns(&self.db, user_id, conversation_id, limit).await
    }

    async fn save_message(&self, message: NewMessage) -> Result<String, PromptSenseError> {
        queries::messages::insert_message(&self.db, message).await
    }

    async fn mark_vector_saved(&self, message_id: &str) -> Result<(), PromptSenseError> {
        queries::messages::mark_vector_saved(&self.db, message_id).await
    }

    async fn history(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>, PromptSenseError> {
        queries::messages::history(&self.db, user_id, limit, offset).await
    }

    async fn common_domains(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, PromptSenseError> {
        queries::messages::common_domains(&self.db, user_id, limit).await
    }

    async fn intent_counts(&self, user_id: &str) -> Result<Vec<(String, u64)>, PromptSenseError> {
        queries::messages::intent_counts(&self.db, user_id).await
    }

    // --- Conversations ---

    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation, PromptSenseError> {
        queries::conversations::create_conversation(&self.db, user_id, title).await
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, PromptSenseError> {
        queries::conversations::list_conversations(&self.db, user_id).await
    }

    async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, PromptSenseError> {
        queries::messages::conversation_messages(&self.db, conversation_id).await
    }

    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), PromptSenseError> {
        queries::conversations::update_title(&self.db, conversation_id, title).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, PromptSenseError> {
        queries::conversations::delete_conversation(&self.db, conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptsense_core::types::Tone;

    #[tokio::test]
    async fn open_from_config_and_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("ps.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let store = SqliteSessionStore::open(&config).await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn trait_object_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("ps.db"), true).await.unwrap();
        let store: Box<dyn SessionStore> = Box::new(SqliteSessionStore::new(db));

        store.ensure_user("u1", "Ada").await.unwrap();
        store
            .update_preferences(
                "u1",
                UserPreferences {
                    tone: Some(Tone::Casual),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get_preferences("u1").await.unwrap().tone, Some(Tone::Casual));

        let conv = store.create_conversation("u1", Some("Chat")).await.unwrap();
        let id = store
            .save_message(NewMessage {
                user_id: "u1".into(),
                conversation_id: Some(conv.id.clone()),
                role: "user".into(),
                content: "hello".into(),
                intent: Some("conversation".into()),
                domain: Some("general".into()),
                enhanced_prompt: None,
                metadata: None,
            })
            .await
            .unwrap();
        store.mark_vector_saved(&id).await.unwrap();

        let turns = store.recent_turns("u1", Some(&conv.id), 5).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert!(store.recent_turns("u1", Some("other"), 5).await.unwrap().is_empty());
        assert_eq!(store.conversation_messages(&conv.id).await.unwrap()[0].id, id);
    }
}
