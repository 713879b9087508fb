// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use promptsense_core::PromptSenseError;
use promptsense_core::types::Conversation;
use rusqlite::params;

use crate::database::{Database, map_tr_err, now_timestamp};

/// Create a conversation for `user_id`.
pub async fn create_conversation(
    db: &Database,
    user_id: &str,
    title: Option<&str>,
) -> Result<Conversation, PromptSenseError> {
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: title.map(String::from),
        message_count: 0,
        created_at: now_timestamp(),
        updated_at: now_timestamp(),
    };
    let row = conversation.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations (id, user_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.id, row.user_id, row.title, row.created_at, row.updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(conversation)
}

/// A user's conversations, most recently active first.
pub async fn list_conversations(db: &Database, user_id: &str) -> Result<Vec<Conversation>, PromptSenseError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.user_id, c.title, c.created_at, c.updated_at,
                        (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id)
                 FROM conversations c
                 WHERE c.user_id = ?1
                 ORDER BY c.updated_at DESC, c.rowid DESC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                let count: i64 = row.get(5)?;
                Ok(Conversation {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    title: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    message_count: count.max(0) as u64,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Set a conversation's title.
pub async fn update_title(db: &Database, conversation_id: &str, title: &str) -> Result<(), PromptSenseError> {
    let conversation_id = conversation_id.to_string();
    let title = title.to_string();
    let now = now_timestamp();
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3",
                params![title, now, conversation_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(PromptSenseError::Storage {
            source: "conversation not found".into(),
        });
    }
    Ok(())
}

/// Delete a conversation and its messages. Returns whether it existed.
pub async fn delete_conversation(db: &Database, conversation_id: &str) -> Result<bool, PromptSenseError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            let deleted = tx.execute(
                "DELETE FROM conversations WHERE id = ?1",
                params![conversation_id],
            )?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}
