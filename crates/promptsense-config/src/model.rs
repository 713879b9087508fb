// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for PromptSense.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level PromptSense configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PromptSenseConfig {
    /// OpenAI API settings for embeddings and chat completion.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Session store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Vector memory index settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// How much context the pipeline pulls in per request.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Query refinement settings.
    #[serde(default)]
    pub refiner: RefinerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OpenAI API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Output token cap for the final response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for the final response.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    data_dir()
        .join("promptsense.db")
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Vector memory index configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Embedding dimension. Must match the embedding model's output.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Path to the vector blob artifact.
    #[serde(default = "default_vector_path")]
    pub vector_path: String,

    /// Path to the JSON metadata manifest artifact.
    #[serde(default = "default_metadata_path")]
    pub metadata_path: String,

    /// Number of appends between automatic saves.
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,

    /// Search fetches `k * overfetch_multiplier` candidates before owner filtering.
    #[serde(default = "default_overfetch_multiplier")]
    pub overfetch_multiplier: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            vector_path: default_vector_path(),
            metadata_path: default_metadata_path(),
            flush_interval: default_flush_interval(),
            overfetch_multiplier: default_overfetch_multiplier(),
        }
    }
}

fn default_dimension() -> usize {
    3072
}

fn default_vector_path() -> String {
    data_dir()
        .join("promptsense_index.bin")
        .to_string_lossy()
        .to_string()
}

fn default_metadata_path() -> String {
    data_dir()
        .join("promptsense_metadata.json")
        .to_string_lossy()
        .to_string()
}

fn default_flush_interval() -> usize {
    10
}

fn default_overfetch_multiplier() -> usize {
    3
}

/// Retrieval limits for each request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Number of similar past queries to retrieve.
    #[serde(default = "default_similar_queries_limit")]
    pub similar_queries_limit: usize,

    /// Number of recent turns fetched from the session store.
    #[serde(default = "default_recent_turns_limit")]
    pub recent_turns_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similar_queries_limit: default_similar_queries_limit(),
            recent_turns_limit: default_recent_turns_limit(),
        }
    }
}

fn default_similar_queries_limit() -> usize {
    3
}

fn default_recent_turns_limit() -> usize {
    5
}

/// Query refinement configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RefinerConfig {
    #[serde(default = "default_refiner_enabled")]
    pub enabled: bool,

    /// Refinement calls running longer than this are abandoned.
    #[serde(default = "default_refiner_timeout_secs")]
    pub timeout_secs: u64,

    /// A refinement longer than `max_growth_ratio` times the original is discarded.
    #[serde(default = "default_max_growth_ratio")]
    pub max_growth_ratio: f64,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            enabled: default_refiner_enabled(),
            timeout_secs: default_refiner_timeout_secs(),
            max_growth_ratio: default_max_growth_ratio(),
        }
    }
}

fn default_refiner_enabled() -> bool {
    true
}

fn default_refiner_timeout_secs() -> u64 {
    10
}

fn default_max_growth_ratio() -> f64 {
    2.0
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Per-user data directory, falling back to the working directory.
fn data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("promptsense"))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}
