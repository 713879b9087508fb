// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations and per-user aggregates.

use promptsense_core::PromptSenseError;
use promptsense_core::types::{NewMessage, RecentTurn, StoredMessage};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err, now_timestamp};

const MESSAGE_COLUMNS: &str = "id, user_id, conversation_id, role, content, intent, domain, enhanced_prompt, metadata, vector_saved, created_at";

pub(crate) fn row_to_message(row: &Row<'_>) -> Result<StoredMessage, rusqlite::Error> {
    Ok(StoredMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        conversation_id: row.get(2)?,
        role: row.get(3)?,
        content: row.get(4)?,
        intent: row.get(5)?,
        domain: row.get(6)?,
        enhanced_prompt: row.get(7)?,
        metadata: row.get(8)?,
        vector_saved: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Insert a message and return its generated id.
///
/// Touches the parent conversation's `updated_at` when there is one.
pub async fn insert_message(db: &Database, msg: NewMessage) -> Result<String, PromptSenseError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    let metadata = msg.metadata.as_ref().map(|m| m.to_string());
    let row_id = id.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, user_id, conversation_id, role, content, intent, domain, enhanced_prompt, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    row_id,
                    msg.user_id,
                    msg.conversation_id,
                    msg.role,
                    msg.content,
                    msg.intent,
                    msg.domain,
                    msg.enhanced_prompt,
                    metadata,
                    now,
                ],
            )?;
            if let Some(conversation_id) = &msg.conversation_id {
                tx.execute(
                    "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                    params![now, conversation_id],
                )?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)?;
    Ok(id)
}

/// Flag a message as having its embedding in the vector index.
pub async fn mark_vector_saved(db: &Database, message_id: &str) -> Result<(), PromptSenseError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE messages SET vector_saved = 1 WHERE id = ?1",
                params![message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The latest `limit` turns of a user, oldest first. Scoped to one
/// conversation when `conversation_id` is given.
pub async fn recent_turns(
    db: &Database,
    user_id: &str,
    conversation_id: Option<&str>,
    limit: usize,
) -> Result<Vec<RecentTurn>, PromptSenseError> {
    let user_id = user_id.to_string();
    let conversation_id = conversation_id.map(String::from);
    let limit = limit as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<RecentTurn>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT role, content, intent, domain FROM messages
                 WHERE user_id = ?1 AND (?2 IS NULL OR conversation_id = ?2)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![user_id, conversation_id, limit], |row| {
                Ok(RecentTurn {
                    role: row.get(0)?,
                    content: row.get(1)?,
                    intent: row.get(2)?,
                    domain: row.get(3)?,
                })
            })?;
            let mut turns = rows.collect::<Result<Vec<_>, _>>()?;
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(map_tr_err)
}

/// A page of a user's messages, newest first.
pub async fn history(
    db: &Database,
    user_id: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<StoredMessage>, PromptSenseError> {
    let user_id = user_id.to_string();
    let (limit, offset) = (limit as i64, offset as i64);
    db.connection()
        .call(move |conn| -> Result<Vec<StoredMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(params![user_id, limit, offset], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// All messages of a conversation in chronological order.
pub async fn conversation_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<StoredMessage>, PromptSenseError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<StoredMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// A user's most frequent message domains, most frequent first.
pub async fn common_domains(
    db: &Database,
    user_id: &str,
    limit: usize,
) -> Result<Vec<String>, PromptSenseError> {
    let user_id = user_id.to_string();
    let limit = limit as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT domain, COUNT(*) AS n FROM messages
                 WHERE user_id = ?1 AND domain IS NOT NULL
                 GROUP BY domain
                 ORDER BY n DESC, domain ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Intent label counts over the user's own messages, largest first.
pub async fn intent_counts(db: &Database, user_id: &str) -> Result<Vec<(String, u64)>, PromptSenseError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<(String, u64)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT intent, COUNT(*) AS n FROM messages
                 WHERE user_id = ?1 AND role = 'user' AND intent IS NOT NULL
                 GROUP BY intent
                 ORDER BY n DESC, intent ASC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get(0)?, count.max(0) as u64))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db"), true).await.unwrap();
        (db, dir)
    }

    fn make_msg(user: &str, role: &str, content: &str, domain: Option<&str>) -> NewMessage {
        NewMessage {
            user_id: user.into(),
            conversation_id: None,
            role: role.into(),
            content: content.into(),
            intent: Some("learning".into()),
            domain: domain.map(String::from),
            enhanced_prompt: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn recent_turns_are_chronological_and_limited() {
        let (db, _dir) = setup_db().await;
        for i in 0..6 {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            insert_message(&db, make_msg("u1", role, &format!("msg {i}"), None))
                .await
                .unwrap();
        }
        insert_message(&db, make_msg("u2", "user", "other user", None))
            .await
            .unwrap();

        let turns = recent_turns(&db, "u1", None, 3).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 3", "msg 4", "msg 5"]);
    }

    #[tokio::test]
    async fn metadata_and_vector_flag_round_trip() {
        let (db, _dir) = setup_db().await;
        let mut msg = make_msg("u1", "user", "hello", Some("general"));
        msg.enhanced_prompt = Some("[User Profile: ...]".into());
        msg.metadata = Some(serde_json::json!({"similar_queries_count": 2}));
        let id = insert_message(&db, msg).await.unwrap();

        let stored = history(&db, "u1", 10, 0).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].vector_saved);
        let meta: serde_json::Value =
            serde_json::from_str(stored[0].metadata.as_deref().unwrap()).unwrap();
        assert_eq!(meta["similar_queries_count"], 2);

        mark_vector_saved(&db, &id).await.unwrap();
        assert!(history(&db, "u1", 10, 0).await.unwrap()[0].vector_saved);
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            insert_message(&db, make_msg("u1", "user", &format!("q{i}"), None))
                .await
                .unwrap();
        }
        let page: Vec<String> = history(&db, "u1", 2, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(page, vec!["q3", "q2"]);
    }

    #[tokio::test]
    async fn aggregates_count_domains_and_intents() {
        let (db, _dir) = setup_db().await;
        for domain in ["science", "technology", "science", "travel", "science", "technology"] {
            insert_message(&db, make_msg("u1", "user", "q", Some(domain)))
                .await
                .unwrap();
        }
        let mut assistant = make_msg("u1", "assistant", "a", Some("science"));
        assistant.intent = Some("creative".into());
        insert_message(&db, assistant).await.unwrap();

        let domains = common_domains(&db, "u1", 2).await.unwrap();
        assert_eq!(domains, vec!["science", "technology"]);

        let intents = intent_counts(&db, "u1").await.unwrap();
        assert_eq!(intents, vec![("learning".to_string(), 6)]);
    }
}
