// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `promptsense index`, `promptsense insights` and `promptsense prefs`.
//!
//! Read-mostly commands that touch the session store and the vector index
//! without calling the model.

use std::io::IsTerminal;

use colored::Colorize;
use promptsense_agent::{UserInsights, user_insights};
use promptsense_config::PromptSenseConfig;
use promptsense_core::PromptSenseError;
use promptsense_core::traits::{PluginAdapter, SessionStore};
use promptsense_core::types::UserPreferences;
use promptsense_memory::{EntryMetadata, IndexStats};
use serde::Serialize;

use crate::runtime::{open_index, open_store};

fn print_json<T: Serialize>(value: &T) -> Result<(), PromptSenseError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| PromptSenseError::Internal(format!("failed to render JSON: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn use_color() -> bool {
    std::io::stdout().is_terminal()
}

/// Run `promptsense index stats`.
pub async fn run_index_stats(config: &PromptSenseConfig, json: bool) -> Result<(), PromptSenseError> {
    let index = open_index(config).await?;
    let stats = index.stats()?;
    if json {
        return print_json(&stats);
    }
    print!("{}", format_stats(&stats, &config.index.vector_path));
    Ok(())
}

fn format_stats(stats: &IndexStats, vector_path: &str) -> String {
    format!(
        "\n  promptsense index\n  {}\n    Vectors:   {}\n    Dimension: {}\n    Metadata:  {}\n    Path:      {}\n\n",
        "-".repeat(35),
        stats.total_vectors,
        stats.dimension,
        stats.metadata_count,
        vector_path
    )
}

/// Run `promptsense index history`.
pub async fn run_index_history(
    config: &PromptSenseConfig,
    user_id: &str,
    limit: usize,
    json: bool,
) -> Result<(), PromptSenseError> {
    let index = open_index(config).await?;
    let entries = index.owner_history(user_id, limit)?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("no indexed queries for {user_id}");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

fn format_entry(entry: &EntryMetadata) -> String {
    format!(
        "{:>6}  [{}/{}]  {}",
        entry.position,
        entry.intent.as_deref().unwrap_or("-"),
        entry.domain.as_deref().unwrap_or("-"),
        entry.text
    )
}

/// Run `promptsense index purge`.
pub async fn run_index_purge(config: &PromptSenseConfig, user_id: &str) -> Result<(), PromptSenseError> {
    let index = open_index(config).await?;
    let owner = user_id.to_string();
    let purge_index = index.clone();
    let removed = tokio::task::spawn_blocking(move || purge_index.rebuild_excluding(&owner))
        .await
        .map_err(|e| PromptSenseError::Internal(format!("purge task failed: {e}")))??;
    println!(
        "removed {removed} vector(s) for {user_id}; {} remaining",
        index.len()?
    );
    Ok(())
}

/// Run `promptsense insights`.
pub async fn run_insights(
    config: &PromptSenseConfig,
    user_id: &str,
    json: bool,
) -> Result<(), PromptSenseError> {
    let store = open_store(config).await?;
    let index = open_index(config).await?;
    let insights = user_insights(store.as_ref(), &index, user_id).await?;
    store.shutdown().await?;

    if json {
        return print_json(&insights);
    }
    print!("{}", format_insights(user_id, &insights, use_color()));
    Ok(())
}

pub(crate) fn format_insights(user_id: &str, insights: &UserInsights, color: bool) -> String {
    let title = format!("insights for {user_id}");
    let mut out = format!(
        "\n  {}\n  {}\n",
        if color { title.bold().to_string() } else { title },
        "-".repeat(35)
    );
    out.push_str(&format!("    Indexed queries: {}\n", insights.indexed_queries));
    let domains = if insights.common_domains.is_empty() {
        "-".to_string()
    } else {
        insights.common_domains.join(", ")
    };
    out.push_str(&format!("    Top domains:     {domains}\n"));
    out.push_str("    Intents:\n");
    if insights.intent_counts.is_empty() {
        out.push_str("      -\n");
    }
    for item in &insights.intent_counts {
        out.push_str(&format!("      {:<16} {}\n", item.intent, item.count));
    }
    out.push('\n');
    out
}

/// Run `promptsense prefs set`.
pub async fn run_prefs_set(
    config: &PromptSenseConfig,
    user_id: &str,
    update: UserPreferences,
) -> Result<(), PromptSenseError> {
    let store = open_store(config).await?;
    store.ensure_user(user_id, user_id).await?;
    let merged = store.update_preferences(user_id, update).await?;
    store.shutdown().await?;
    print_json(&merged)
}

/// Run `promptsense prefs show`.
pub async fn run_prefs_show(config: &PromptSenseConfig, user_id: &str) -> Result<(), PromptSenseError> {
    let store = open_store(config).await?;
    let preferences = store.get_preferences(user_id).await?;
    store.shutdown().await?;
    print_json(&preferences)
}
