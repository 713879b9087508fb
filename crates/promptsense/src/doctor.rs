// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `promptsense doctor` command implementation.
//!
//! Runs diagnostic checks against the PromptSense environment to identify
//! configuration issues, unreadable artifacts and connectivity problems.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use promptsense_config::PromptSenseConfig;
use promptsense_core::PromptSenseError;
use promptsense_memory::snapshot::{self, LoadOutcome};
use promptsense_storage::Database;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `promptsense doctor` command.
///
/// With `deep`, also runs the SQLite integrity check and reports allocator
/// statistics. With `plain`, disables colored output.
pub async fn run_doctor(
    config: &PromptSenseConfig,
    config_path: Option<&Path>,
    deep: bool,
    plain: bool,
) -> Result<(), PromptSenseError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = vec![
        check_config(config_path),
        check_database(&config.storage.database_path).await,
        check_index_artifacts(config),
        check_api_key(config),
        check_api_connectivity(config).await,
    ];

    if deep {
        results.push(check_db_integrity(&config.storage.database_path).await);
        results.push(check_memory_baseline());
    }

    println!();
    println!("  promptsense doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        match result.status {
            CheckStatus::Pass => {}
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
        }
        println!("{}", format_line(result, use_color));
    }

    println!();
    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
        if !deep {
            println!("  Run with --deep for detailed diagnostics.");
        }
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    use colored::Colorize;

    let duration_ms = result.duration.as_millis();
    if use_color {
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Check configuration loads without errors.
fn check_config(config_path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match config_path {
        Some(path) => promptsense_config::load_and_validate_path(path),
        None => promptsense_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Check the database file exists and can be opened.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    match Database::open(db_path, true).await {
        Ok(db) => {
            let query: Result<i64, PromptSenseError> = db
                .connection()
                .call(|conn| -> Result<i64, rusqlite::Error> {
                    conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
                })
                .await
                .map_err(promptsense_storage::database::map_tr_err);
            match query {
                Ok(count) => CheckResult::new(
                    "Database",
                    CheckStatus::Pass,
                    format!("connected ({count} messages)"),
                    start,
                ),
                Err(e) => CheckResult::new(
                    "Database",
                    CheckStatus::Fail,
                    format!("query failed: {e}"),
                    start,
                ),
            }
        }
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start),
    }
}

/// Check the vector blob and metadata manifest agree.
fn check_index_artifacts(config: &PromptSenseConfig) -> CheckResult {
    let start = Instant::now();
    let outcome = snapshot::load(
        Path::new(&config.index.vector_path),
        Path::new(&config.index.metadata_path),
        config.index.dimension,
    );
    match outcome {
        LoadOutcome::Missing => CheckResult::new(
            "Index artifacts",
            CheckStatus::Warn,
            "not found (will be created on first save)",
            start,
        ),
        LoadOutcome::Incomplete { present } => CheckResult::new(
            "Index artifacts",
            CheckStatus::Fail,
            format!("only {} exists", present.display()),
            start,
        ),
        LoadOutcome::Corrupt { reason } => {
            CheckResult::new("Index artifacts", CheckStatus::Fail, reason, start)
        }
        LoadOutcome::Loaded(snapshot) => CheckResult::new(
            "Index artifacts",
            CheckStatus::Pass,
            format!(
                "{} vectors, dimension {}",
                snapshot.entries.len(),
                config.index.dimension
            ),
            start,
        ),
    }
}

/// Check an OpenAI API key is configured.
fn check_api_key(config: &PromptSenseConfig) -> CheckResult {
    let start = Instant::now();
    match promptsense_openai::resolve_api_key(&config.openai.api_key) {
        Ok(_) => CheckResult::new("API key", CheckStatus::Pass, "configured", start),
        Err(_) => CheckResult::new(
            "API key",
            CheckStatus::Fail,
            "set openai.api_key or OPENAI_API_KEY",
            start,
        ),
    }
}

/// Check the OpenAI endpoint is reachable.
async fn check_api_connectivity(config: &PromptSenseConfig) -> CheckResult {
    let start = Instant::now();
    let Ok(api_key) = promptsense_openai::resolve_api_key(&config.openai.api_key) else {
        return CheckResult::new("OpenAI API", CheckStatus::Warn, "skipped (no API key)", start);
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            return CheckResult::new(
                "OpenAI API",
                CheckStatus::Fail,
                format!("HTTP client error: {e}"),
                start,
            );
        }
    };

    let url = format!("{}/models", config.openai.base_url.trim_end_matches('/'));
    match client.get(&url).bearer_auth(api_key).send().await {
        Ok(resp) if resp.status().is_success() => {
            CheckResult::new("OpenAI API", CheckStatus::Pass, "reachable", start)
        }
        Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => CheckResult::new(
            "OpenAI API",
            CheckStatus::Fail,
            "API key rejected (401)",
            start,
        ),
        Ok(resp) => CheckResult::new(
            "OpenAI API",
            CheckStatus::Warn,
            format!("status {}", resp.status()),
            start,
        ),
        Err(e) => {
            let msg = if e.is_timeout() {
                "timeout (5s)".to_string()
            } else if e.is_connect() {
                "connection refused".to_string()
            } else {
                format!("error: {e}")
            };
            CheckResult::new("OpenAI API", CheckStatus::Fail, msg, start)
        }
    }
}

/// Deep check: SQLite integrity check.
async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "DB integrity",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    let result = match Database::open(db_path, true).await {
        Ok(db) => db.integrity_check().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(status) if status == "ok" => CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start),
        Ok(status) => CheckResult::new("DB integrity", CheckStatus::Fail, status, start),
        Err(e) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("check failed: {e}"),
            start,
        ),
    }
}

/// Deep check: memory baseline via jemalloc.
fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);

        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptsense_memory::snapshot::Snapshot;

    fn config_in(dir: &Path) -> PromptSenseConfig {
        let mut config = PromptSenseConfig::default();
        config.storage.database_path = dir.join("ps.db").to_string_lossy().into_owned();
        config.index.dimension = 2;
        config.index.vector_path = dir.join("v.bin").to_string_lossy().into_owned();
        config.index.metadata_path = dir.join("m.json").to_string_lossy().into_owned();
        config
    }

    #[test]
    fn plain_lines_are_tagged() {
        let result = CheckResult {
            name: "Database".to_string(),
            status: CheckStatus::Warn,
            message: "not found".to_string(),
            duration: Duration::from_millis(5),
        };
        let line = format_line(&result, false);
        assert!(line.starts_with("    [WARN] Database"));
        assert!(line.ends_with("not found (5ms)"));
    }

    #[tokio::test]
    async fn check_database_missing_warns() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_database(&dir.path().join("none.db").to_string_lossy()).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn check_database_existing_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ps.db");
        Database::open(&path, true).await.unwrap();
        let result = check_database(&path.to_string_lossy()).await;
        assert_eq!(result.status, CheckStatus::Pass);
        assert!(result.message.contains("0 messages"));

        let integrity = check_db_integrity(&path.to_string_lossy()).await;
        assert_eq!(integrity.status, CheckStatus::Pass);
    }

    #[test]
    fn index_artifacts_states() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert_eq!(check_index_artifacts(&config).status, CheckStatus::Warn);

        snapshot::save(
            Path::new(&config.index.vector_path),
            Path::new(&config.index.metadata_path),
            2,
            &Snapshot::default(),
        )
        .unwrap();
        assert_eq!(check_index_artifacts(&config).status, CheckStatus::Pass);

        std::fs::remove_file(&config.index.metadata_path).unwrap();
        let result = check_index_artifacts(&config);
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.starts_with("only "));
    }

    #[test]
    fn check_memory_baseline_reports() {
        let result = check_memory_baseline();
        assert!(result.status == CheckStatus::Pass || result.status == CheckStatus::Warn);
    }
}
