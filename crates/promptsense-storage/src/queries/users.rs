// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User rows and their stored preferences.

use promptsense_core::PromptSenseError;
use promptsense_core::types::UserPreferences;
use rusqlite::{OptionalExtension, params};
use tracing::warn;

use crate::database::{Database, map_tr_err, now_timestamp};

/// Insert the user if no row with that id exists.
pub async fn ensure_user(db: &Database, user_id: &str, name: &str) -> Result<(), PromptSenseError> {
    let user_id = user_id.to_string();
    let name = name.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO users (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                params![user_id, name, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Whether a user row exists.
pub async fn user_exists(db: &Database, user_id: &str) -> Result<bool, PromptSenseError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", params![user_id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
        .await
        .map_err(map_tr_err)
}

/// Stored preferences, or defaults when the user or the column is missing.
///
/// A column that no longer parses is logged and treated as empty.
pub async fn get_preferences(db: &Database, user_id: &str) -> Result<UserPreferences, PromptSenseError> {
    let lookup = user_id.to_string();
    let raw = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let row: Option<Option<String>> = conn
                .query_row(
                    "SELECT preferences FROM users WHERE id = ?1",
                    params![lookup],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(row.flatten())
        })
        .await
        .map_err(map_tr_err)?;

    Ok(parse_preferences(user_id, raw.as_deref()))
}

fn parse_preferences(user_id: &str, raw: Option<&str>) -> UserPreferences {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return UserPreferences::default();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(user_id, error = %e, "stored preferences are invalid, using defaults");
        UserPreferences::default()
    })
}

/// Merge `update` into the stored preferences and return the result.
///
/// Creates the user (named after its id) when missing.
pub async fn update_preferences(
    db: &Database,
    user_id: &str,
    update: UserPreferences,
) -> Result<UserPreferences, PromptSenseError> {
    let mut merged = get_preferences(db, user_id).await?;
    merged.merge(update);

    let json = serde_json::to_string(&merged).map_err(|e| PromptSenseError::Storage {
        source: Box::new(e),
    })?;
    let user_id = user_id.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO users (id, name, preferences, created_at, updated_at)
                 VALUES (?1, ?1, ?2, ?3, ?3)
                 ON CONFLICT(id) DO UPDATE SET preferences = excluded.preferences, updated_at = excluded.updated_at",
                params![user_id, json, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

    Ok(merged)
}
